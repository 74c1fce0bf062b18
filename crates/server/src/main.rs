//! metafetch server entry point.
//!
//! Boots the metadata HTTP endpoint on the configured listen address.
//! Logs go to stderr as JSON lines.

use anyhow::{Context, Result};
use metafetch_client::MetadataService;
use metafetch_core::{AppConfig, Caches};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let caches = Caches::open(&config).await?;
    let service = MetadataService::from_config(&config, &caches)?;
    let state = handler::AppState::new(service, caches.denials.clone());

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, backend = ?config.cache_backend, "Starting metafetch server");

    axum::serve(listener, handler::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
