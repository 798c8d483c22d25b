use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use pinguin_server::{bootstrap, load_config, run};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Pinguin notification dispatch server.
#[derive(Parser, Debug)]
#[command(name = "pinguin-server", about = "Multi-tenant notification dispatch service")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "pinguin.yaml")]
    config: PathBuf,

    /// Log level passed to the `tracing-subscriber` env filter (overridden
    /// by `RUST_LOG` when set).
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Exit code on a forced shutdown timeout (§6: "2 forced shutdown timeout").
const EXIT_SHUTDOWN_TIMEOUT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)))
        .init();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, path = %cli.config.display(), "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let drain_timeout = Duration::from_secs(config.scheduler.drain_timeout_sec);

    let app = match bootstrap(config).await {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut run_task = tokio::spawn(run(app, shutdown_rx));

    tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal received, draining in-flight dispatches");
            let _ = shutdown_tx.send(true);
        }
        result = &mut run_task => {
            return match result {
                Ok(Ok(())) => ExitCode::SUCCESS,
                Ok(Err(err)) => {
                    error!(error = %err, "server exited with an error");
                    ExitCode::FAILURE
                }
                Err(err) => {
                    error!(error = %err, "server task panicked");
                    ExitCode::FAILURE
                }
            };
        }
    }

    match tokio::time::timeout(drain_timeout, run_task).await {
        Ok(Ok(Ok(()))) => {
            info!("shut down cleanly");
            ExitCode::SUCCESS
        }
        Ok(Ok(Err(err))) => {
            error!(error = %err, "server exited with an error during shutdown");
            ExitCode::FAILURE
        }
        Ok(Err(err)) => {
            error!(error = %err, "server task panicked during shutdown");
            ExitCode::FAILURE
        }
        Err(_) => {
            warn!(timeout = ?drain_timeout, "forced shutdown: drain timeout elapsed with work still in flight");
            ExitCode::from(EXIT_SHUTDOWN_TIMEOUT)
        }
    }
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever arrives first.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
