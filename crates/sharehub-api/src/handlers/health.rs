//! Health check handler.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let storage = match state.storage.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, "Blob store health check failed");
            false
        }
    };

    let database = state.stores.is_healthy().await;

    Json(ApiResponse::ok(HealthResponse {
        status: if storage && database { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage,
        database,
    }))
}
