//! Application builder: wires router, middleware and state into an Axum app
//! and runs it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use sharehub_core::config::AppConfig;
use sharehub_core::error::AppError;
use sharehub_database::Stores;
use sharehub_storage::{BlobBackend, PresignedLinks};

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// How often expired pre-signed links are swept.
const LINK_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Runs the ShareHub server until Ctrl+C.
pub async fn run_server(
    config: AppConfig,
    stores: Stores,
    blobs: BlobBackend,
) -> Result<(), AppError> {
    info!("Starting ShareHub server...");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let purge = tokio::spawn(purge_links(Arc::clone(&blobs.links), shutdown_rx));

    let app = build_app(AppState::new(config, stores, blobs));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!(address = %addr, "ShareHub server listening");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = purge.await {
        error!(error = %e, "Link purge task failed");
    }

    served.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
    info!("ShareHub server stopped");
    Ok(())
}

async fn purge_links(links: Arc<PresignedLinks>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(LINK_PURGE_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => links.purge_expired(),
            _ = shutdown.changed() => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
