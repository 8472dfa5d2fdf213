use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Outcome of one validator for one response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { reason: String },
    /// Listed in the endpoint's excluded validators
    Skipped,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorOutcome {
    pub validator: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Validation result for a single captured response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub endpoint: String,
    pub url: String,
    pub status_code: u16,
    pub outcomes: Vec<ValidatorOutcome>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        !self.outcomes.iter().any(|o| o.outcome.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidatorOutcome> {
        self.outcomes.iter().filter(|o| o.outcome.is_failure())
    }

    pub fn outcome_of(&self, validator: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.validator == validator)
            .map(|o| &o.outcome)
    }
}

/// An endpoint, or one of its resolved requests, that produced no response
#[derive(Debug, Clone, Serialize)]
pub struct EndpointFailure {
    pub endpoint: String,
    /// Set when a single resolved request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub error: String,
}

/// Everything observed during one pass over the loaded endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    pub duration_ms: i64,
    pub reports: Vec<ValidationReport>,
    pub errors: Vec<EndpointFailure>,
    /// Disabled endpoints that were not executed
    pub skipped: usize,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.reports.len() + self.errors.len()
    }

    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Percentage of passing checks (0.0 - 100.0)
    pub fn pass_rate(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            (self.passed() as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} ({} ms)", self.run_id, self.duration_ms)?;
        for report in &self.reports {
            let mark = if report.passed() { "PASS" } else { "FAIL" };
            writeln!(
                f,
                "  [{}] {} {} -> {}",
                mark, report.endpoint, report.url, report.status_code
            )?;
            for failure in report.failures() {
                if let Outcome::Failed { reason } = &failure.outcome {
                    writeln!(f, "         {}: {}", failure.validator, reason)?;
                }
            }
        }
        for error in &self.errors {
            match &error.url {
                Some(url) => writeln!(f, "  [ERR ] {} {}: {}", error.endpoint, url, error.error)?,
                None => writeln!(f, "  [ERR ] {}: {}", error.endpoint, error.error)?,
            }
        }
        write!(
            f,
            "Total: {}  Passed: {}  Failed: {}  Skipped: {}  Pass rate: {:.2}%",
            self.total(),
            self.passed(),
            self.failed(),
            self.skipped,
            self.pass_rate()
        )
    }
}
