//! Quota handler.

use axum::Json;
use axum::extract::State;

use sharehub_entity::quota::QuotaInfo;

use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/quota
pub async fn get_quota(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<QuotaInfo>>, ApiError> {
    let settings = state.settings_snapshot().await;
    let info = state
        .quota_tracker
        .get_user_quota(&settings, auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(info)))
}
