//! Unauthenticated share endpoints used by link recipients.

use axum::Json;
use axum::extract::{Path, Query, State};

use sharehub_entity::share::ShareAccess;
use sharehub_service::share::PublicShareInfo;

use crate::dto::request::{PublicShareQuery, ShareVerifyRequest};
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::{ClientInfo, ValidatedJson};
use crate::state::AppState;

/// GET /api/public/share/{token}
pub async fn share_info(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    Path(token): Path<String>,
    Query(query): Query<PublicShareQuery>,
) -> Result<Json<ApiResponse<PublicShareInfo>>, ApiError> {
    let info = state
        .share_service
        .public_share_info(&token, query.password.as_deref(), &client)
        .await?;
    Ok(Json(ApiResponse::ok(info)))
}

/// POST /api/public/share/{token}/validate
///
/// Lets a client check a password before it starts a download.
pub async fn validate_share(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidatedJson(req): ValidatedJson<ShareVerifyRequest>,
) -> Result<Json<ApiResponse<ShareAccess>>, ApiError> {
    let access = state
        .permission_resolver
        .validate_share_token(&token, req.password.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(access)))
}
