use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use acars_bridge::log_watcher::{LogWatcherConfig, run_log_watcher};
use acars_bridge::state::AircraftStateStore;
use acars_bridge::web::start_web_server;

#[derive(Debug, Parser)]
#[command(
    name = "acars-bridge",
    about = "Parses ACARS datalink logs and serves per-flight state over HTTP"
)]
struct Args {
    /// Directory containing the ACARS log files
    #[arg(long, env = "ACARS_LOG_DIR", default_value = ".")]
    log_dir: PathBuf,

    /// Interface to bind the web server to
    #[arg(long, env = "ACARS_INTERFACE", default_value = "0.0.0.0")]
    interface: String,

    /// Port for the web server
    #[arg(long, env = "ACARS_PORT", default_value_t = 5000)]
    port: u16,

    /// Seconds between log polls
    #[arg(long, env = "ACARS_POLL_INTERVAL", default_value_t = 15)]
    poll_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let store = Arc::new(AircraftStateStore::new());
    let cancel = CancellationToken::new();

    let watcher = tokio::spawn(run_log_watcher(
        LogWatcherConfig {
            log_dir: args.log_dir,
            poll_interval: Duration::from_secs(args.poll_interval),
        },
        store.clone(),
        cancel.clone(),
    ));

    // Graceful shutdown: cancel the watcher and stop serving on Ctrl+C
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal (Ctrl+C), initiating graceful shutdown...");
                shutdown_cancel.cancel();
            }
            Err(err) => error!("Unable to listen for shutdown signal: {err}"),
        }
    });

    start_web_server(args.interface, args.port, store, cancel.clone()).await?;

    cancel.cancel();
    watcher.await?;
    info!("Shutdown complete");
    Ok(())
}
