use std::sync::Arc;

use anyhow::{Context, Result};

use trendscout::api::{AppState, TrendServer};
use trendscout::config::Config;
use trendscout::storage::{create_sqlite_repository, HistoryManager};

/// Serve the read-only trend API until Ctrl+C
pub async fn serve(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    let repository = create_sqlite_repository(&config.storage.sqlite_path)?;
    let history = Arc::new(HistoryManager::new(
        &config.storage.history_path,
        config.storage.retention_days,
    )?);

    let server = TrendServer::new(AppState::new(config, repository, history))?;
    println!("Trend API on http://{}", server.bind_address());
    println!("Press Ctrl+C to stop");

    server
        .start_with_shutdown(shutdown_signal())
        .await
        .context("Trend API failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
