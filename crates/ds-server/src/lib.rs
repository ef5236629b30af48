//! ds-server: HTTP API for device stream access and frame extraction.
//!
//! This crate ties the ds-* crates together into a running server:
//!
//! - Manifest probing and device registry access
//! - The stream access service behind the `/api/stream` routes
//! - Axum router with request ids, tracing, CORS and Swagger UI
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod probe;
pub mod registry;
pub mod router;
pub mod routes;
pub mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use ds_core::config::Config;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Start the devstream server.
///
/// Discovers tools, builds the [`AppContext`] and serves HTTP until a
/// shutdown signal is received.
pub async fn start(config: Config) -> ds_core::Result<()> {
    start_with_cancel(config, CancellationToken::new()).await
}

/// Like [`start`], but also stops when `cancel` is triggered.
pub async fn start_with_cancel(config: Config, cancel: CancellationToken) -> ds_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ds_core::Error::Config(format!("Invalid server address: {e}")))?;

    let tools = Arc::new(ds_av::ToolRegistry::discover(&config.tools));
    log_tools(&tools);

    let frames_dir = config.streams.frames_dir.clone();
    if !frames_dir.exists() {
        tokio::fs::create_dir_all(&frames_dir).await?;
        tracing::info!("Created frames directory {}", frames_dir.display());
    }

    let ctx = AppContext::from_config(config, tools)?;
    let app = router::build_router(ctx);

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ds_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .map_err(|e| ds_core::Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn log_tools(tools: &ds_av::ToolRegistry) {
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}; frame extraction will fail", info.name);
        }
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
