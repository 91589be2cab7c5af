//! idgate - identity gateway server
//!
//! Main entry point: loads configuration from the environment, starts the
//! background sweeps and serves the HTTP routes until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use idgate_api::utils::logging::init_tracing;
use idgate_api::{router, AppContext};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before logging so IDGATE_LOG_JSON and RUST_LOG apply
    let dotenv = dotenvy::dotenv();

    let json_logs = std::env::var("IDGATE_LOG_JSON")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    init_tracing(json_logs)?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => warn!(error = %e, "No .env file loaded"),
    }

    let config = idgate_infra::config::load().context("failed to load configuration")?;
    let bind_addr = config.bind_addr.clone();

    let ctx = Arc::new(AppContext::new(config).context("failed to build application context")?);
    ctx.start_background_tasks().await.context("failed to start background tasks")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "idgate listening");

    let served = axum::serve(listener, router(ctx.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(e) = ctx.shutdown().await {
        warn!(error = %e, "Background tasks did not stop cleanly");
    }
    served.context("server error")?;
    info!("idgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
