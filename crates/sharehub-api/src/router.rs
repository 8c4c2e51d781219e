//! Route definitions for the ShareHub HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`.
//! Transfer routes (downloads, archives, uploads, blob links) run without the
//! request timeout; everything else is bounded by it.

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::timeout::TimeoutLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Multipart framing allowance on top of the largest accepted file.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Build the API router with all routes and request logging.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
    let body_limit = usize::try_from(
        state
            .config
            .storage
            .max_upload_size_bytes
            .saturating_add(MULTIPART_OVERHEAD),
    )
    .unwrap_or(usize::MAX);

    let bounded = Router::new()
        .merge(file_routes())
        .merge(directory_routes())
        .merge(share_routes())
        .merge(public_routes())
        .merge(health_routes())
        .layer(TimeoutLayer::new(timeout));

    let api_routes = Router::new()
        .merge(transfer_routes())
        .merge(bounded)
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .nest("/api", api_routes)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Downloads, archives, uploads and pre-signed blob links
fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/files/{id}/download", get(handlers::file::download_file))
        .route("/files/download/batch", post(handlers::file::download_batch))
        .route("/files/upload", post(handlers::file::upload_file))
        .route(
            "/directories/{id}/download",
            get(handlers::directory::download_directory),
        )
        .route("/blobs/{token}", get(handlers::blob::redeem_link))
}

/// File metadata, delete and move
fn file_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/files/{id}",
            get(handlers::file::get_file).delete(handlers::file::delete_file),
        )
        .route("/files/{id}/move", put(handlers::file::move_file))
}

/// Directory CRUD and move
fn directory_routes() -> Router<AppState> {
    Router::new()
        .route("/directories", post(handlers::directory::create_directory))
        .route(
            "/directories/{id}",
            get(handlers::directory::get_directory)
                .put(handlers::directory::rename_directory)
                .delete(handlers::directory::delete_directory),
        )
        .route(
            "/directories/{id}/move",
            put(handlers::directory::move_directory),
        )
}

/// Share management and quota for the signed-in user
fn share_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/shares",
            post(handlers::share::create_share).get(handlers::share::list_shares),
        )
        .route(
            "/shares/{id}",
            get(handlers::share::get_share)
                .patch(handlers::share::update_share)
                .delete(handlers::share::revoke_share),
        )
        .route("/shares/{id}/access-log", get(handlers::share::access_log))
        .route("/quota", get(handlers::quota::get_quota))
}

/// Unauthenticated share endpoints
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/public/share/{token}", get(handlers::public::share_info))
        .route(
            "/public/share/{token}/validate",
            post(handlers::public::validate_share),
        )
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
