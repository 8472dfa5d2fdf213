use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppResult, ExecError, LoadFailure};
use crate::models::{Endpoint, EndpointFailure, RunReport, ValidationItem};

use super::executor::{Executor, ExecutorConfig, HttpExecutor};
use super::loader::{self, LoadOutcome};
use super::validator::ValidationEngine;

/// Executes endpoints concurrently and validates every captured response
pub struct Runner {
    executor: Arc<dyn Executor>,
    engine: ValidationEngine,
    concurrency: usize,
}

impl Runner {
    pub fn new(executor: Arc<dyn Executor>, engine: ValidationEngine, concurrency: usize) -> Self {
        Self {
            executor,
            engine,
            concurrency: concurrency.max(1),
        }
    }

    /// Build a runner with the HTTP executor and the default validators
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let executor = HttpExecutor::with_config(ExecutorConfig::from(config))?;
        Ok(Self::new(
            Arc::new(executor),
            ValidationEngine::with_defaults(),
            config.concurrency,
        ))
    }

    /// Run every enabled endpoint once
    pub async fn run(&self, endpoints: &[Endpoint]) -> RunReport {
        let started_at = OffsetDateTime::now_utc();
        let start = Instant::now();
        let run_id = Uuid::new_v4();

        let (enabled, disabled): (Vec<&Endpoint>, Vec<&Endpoint>) =
            endpoints.iter().partition(|e| e.enabled);
        for endpoint in &disabled {
            tracing::debug!(run_id = %run_id, endpoint = %endpoint.name, "Skipping disabled endpoint");
        }

        // `buffered` keeps results in definition order
        let results: Vec<_> = stream::iter(enabled)
            .map(|endpoint| async move { (endpoint, self.executor.execute(endpoint).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut reports = Vec::new();
        let mut errors = Vec::new();
        for (endpoint, result) in results {
            let calls = match result {
                Ok(calls) => calls,
                Err(e) => {
                    tracing::error!(
                        run_id = %run_id,
                        endpoint = %endpoint.name,
                        error = %e,
                        transient = e.is_transient(),
                        "Endpoint execution failed"
                    );
                    errors.push(EndpointFailure {
                        endpoint: endpoint.name.clone(),
                        url: None,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            for call in calls {
                match call {
                    Ok(response) => {
                        let item = ValidationItem::new(endpoint.clone(), response);
                        let report = self.engine.validate(&item);
                        if report.passed() {
                            tracing::info!(
                                run_id = %run_id,
                                endpoint = %report.endpoint,
                                url = %report.url,
                                "Endpoint passed"
                            );
                        } else {
                            tracing::warn!(
                                run_id = %run_id,
                                endpoint = %report.endpoint,
                                url = %report.url,
                                status = report.status_code,
                                "Endpoint failed validation"
                            );
                        }
                        reports.push(report);
                    }
                    Err(e) => {
                        let url = match &e {
                            ExecError::Request { url, .. } => Some(url.clone()),
                            _ => None,
                        };
                        tracing::error!(
                            run_id = %run_id,
                            endpoint = %endpoint.name,
                            error = %e,
                            transient = e.is_transient(),
                            "Request failed"
                        );
                        errors.push(EndpointFailure {
                            endpoint: endpoint.name.clone(),
                            url,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        RunReport {
            run_id,
            started_at,
            duration_ms: start.elapsed().as_millis() as i64,
            reports,
            errors,
            skipped: disabled.len(),
        }
    }
}

/// Definitions loaded for a run together with the run's results
#[derive(Debug)]
pub struct RunOutcome {
    pub load: LoadOutcome,
    pub report: RunReport,
}

/// JSON view of a run: the report plus rejected definitions
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutcomeView<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    load_failures: Vec<LoadFailureView<'a>>,
}

#[derive(Serialize)]
struct LoadFailureView<'a> {
    endpoint: &'a str,
    error: String,
}

impl RunOutcome {
    /// True when every definition loaded and every check passed
    pub fn is_success(&self) -> bool {
        self.load.is_clean() && self.report.is_success()
    }

    /// Render the run report as pretty JSON, including load failures
    pub fn to_json(&self) -> serde_json::Result<String> {
        let view = RunOutcomeView {
            report: &self.report,
            load_failures: self.load.failures.iter().map(LoadFailureView::from).collect(),
        };
        serde_json::to_string_pretty(&view)
    }
}

impl<'a> From<&'a LoadFailure> for LoadFailureView<'a> {
    fn from(failure: &'a LoadFailure) -> Self {
        Self {
            endpoint: failure.endpoint(),
            error: failure.to_string(),
        }
    }
}

/// Load the configured definitions and run them once
pub async fn run_once(config: &Config, runner: &Runner) -> AppResult<RunOutcome> {
    let load = loader::load_endpoints(&config.endpoints_path).await?;
    for failure in &load.failures {
        tracing::warn!(endpoint = %failure.endpoint(), error = %failure, "Rejected endpoint definition");
    }
    tracing::info!(
        loaded = load.endpoints.len(),
        rejected = load.failures.len(),
        "Endpoint definitions loaded"
    );

    let report = runner.run(&load.endpoints).await;
    Ok(RunOutcome { load, report })
}
