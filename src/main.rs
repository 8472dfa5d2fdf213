use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;

use endpoint_probe::config::{Config, ReportFormat};
use endpoint_probe::services::{run_once, RunOutcome, Runner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let runner = Runner::from_config(&config).context("Failed to build runner")?;

    let Some(interval) = config.interval() else {
        let run = run_once(&config, &runner).await?;
        print_report(&config, &run)?;
        if !run.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    };

    // Set up graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, stopping probe...");
        let _ = shutdown_tx.send(true);
    });

    tracing::info!(interval_secs = config.interval_secs, "Probe started");
    loop {
        match run_once(&config, &runner).await {
            Ok(run) => {
                tracing::info!(
                    run_id = %run.report.run_id,
                    passed = run.report.passed(),
                    failed = run.report.failed(),
                    "Run completed"
                );
                if let Err(e) = print_report(&config, &run) {
                    tracing::error!(error = %e, "Failed to render report");
                }
            }
            Err(e) => {
                // Definitions may be fixed before the next run
                tracing::error!(error = %e, "Run failed");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown_rx.changed() => {}
        }
        if *shutdown_rx.borrow() {
            break;
        }
    }

    tracing::info!("Probe shutdown complete");
    Ok(())
}

fn print_report(config: &Config, run: &RunOutcome) -> anyhow::Result<()> {
    match config.report_format {
        ReportFormat::Text => {
            for failure in &run.load.failures {
                println!("[LOAD] {}", failure);
            }
            println!("{}", run.report);
        }
        ReportFormat::Json => {
            let json = run.to_json().context("Failed to serialize report")?;
            println!("{}", json);
        }
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
