//! Share management handlers for the share owner.

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use sharehub_core::error::AppError;
use sharehub_core::types::pagination::PageResponse;
use sharehub_entity::share::ShareAccessLog;
use sharehub_service::share::CreateShareParams;

use crate::dto::request::{AccessLogQuery, CreateShareRequest, ShareListQuery, UpdateShareRequest};
use crate::dto::response::{ApiResponse, MessageResponse, ShareResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, PaginationParams, ValidatedJson};
use crate::state::AppState;

/// POST /api/shares
pub async fn create_share(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateShareRequest>,
) -> Result<Json<ApiResponse<ShareResponse>>, ApiError> {
    if !state
        .permission_resolver
        .can_create_share(&auth.principal(), req.resource_type, req.resource_id)
        .await?
    {
        return Err(AppError::forbidden("Only the owner can share this resource").into());
    }

    let settings = state.settings_snapshot().await;
    let params = CreateShareParams {
        resource_type: req.resource_type,
        resource_id: req.resource_id,
        permission_type: req.permission_type,
        password: req.password,
        expires_at: req.expires_at,
    };

    let share = state
        .share_service
        .create_share(params, &settings)
        .await?;
    Ok(Json(ApiResponse::ok(ShareResponse::from_share(
        share,
        &state.config.server.public_url,
    ))))
}

/// GET /api/shares
pub async fn list_shares(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<ShareListQuery>,
) -> Result<Json<ApiResponse<PageResponse<ShareResponse>>>, ApiError> {
    let page = state
        .share_service
        .list_user_shares(auth.user_id, filter.resource_type, params.into_page_request())
        .await?;

    let public_url = state.config.server.public_url.as_str();
    Ok(Json(ApiResponse::ok(
        page.map(|share| ShareResponse::from_share(share, public_url)),
    )))
}

/// GET /api/shares/{id}
pub async fn get_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ShareResponse>>, ApiError> {
    let share = state.share_service.get_owned_share(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(ShareResponse::from_share(
        share,
        &state.config.server.public_url,
    ))))
}

/// PATCH /api/shares/{id}
pub async fn update_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateShareRequest>,
) -> Result<Json<ApiResponse<ShareResponse>>, ApiError> {
    let share = state
        .share_service
        .update_share_expiration(id, auth.user_id, req.expires_at)
        .await?;
    Ok(Json(ApiResponse::ok(ShareResponse::from_share(
        share,
        &state.config.server.public_url,
    ))))
}

/// DELETE /api/shares/{id}
pub async fn revoke_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.share_service.get_share_by_id(id).await?;
    if !state
        .permission_resolver
        .can_revoke_share(&auth.principal(), id)
        .await?
    {
        return Err(AppError::forbidden("You do not own this share").into());
    }

    state.share_service.revoke_share(id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Share revoked"))))
}

/// GET /api/shares/{id}/access-log
pub async fn access_log(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<AccessLogQuery>,
) -> Result<Json<ApiResponse<Vec<ShareAccessLog>>>, ApiError> {
    let entries = state
        .share_service
        .share_access_log(id, auth.user_id, query.limit)
        .await?;
    Ok(Json(ApiResponse::ok(entries)))
}
