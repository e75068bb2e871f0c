//! # Schulte Pool Runtime
//!
//! Entry point: logging, configuration, session, report.

use std::sync::Arc;

use anyhow::Result;
use pool_runtime::{load_config, PoolRuntime};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG overrides the default level)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = load_config()?;

    let runtime = Arc::new(PoolRuntime::new(config)?);

    // Ctrl+C ends the session early
    let signal_runtime = Arc::clone(&runtime);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received");
                signal_runtime.shutdown();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    info!("Pool is running. Press Ctrl+C to stop.");
    let reports = runtime.run().await?;

    runtime.report(&reports)?;
    info!("Shutdown complete");

    Ok(())
}
