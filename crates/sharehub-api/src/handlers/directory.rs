//! Directory handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use uuid::Uuid;

use sharehub_entity::directory::Directory;

use crate::dto::request::{
    CreateDirectoryRequest, MoveDirectoryRequest, RenameDirectoryRequest, ShareQuery,
};
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, MaybeAuthUser, ValidatedJson};
use crate::handlers::archive_response;
use crate::state::AppState;

/// GET /api/directories/{id}/download
pub async fn download_directory(
    State(state): State<AppState>,
    MaybeAuthUser(principal): MaybeAuthUser,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
    Query(query): Query<ShareQuery>,
) -> Result<Response, ApiError> {
    let ctx = state.context(principal, query.credential(), client).await;
    let archive = state.delivery_engine.download_directory(&ctx, id).await?;
    archive_response(archive)
}

/// POST /api/directories
///
/// Accepts a share token so upload-capable shares can create subdirectories.
pub async fn create_directory(
    State(state): State<AppState>,
    MaybeAuthUser(principal): MaybeAuthUser,
    ClientInfo(client): ClientInfo,
    Query(query): Query<ShareQuery>,
    ValidatedJson(req): ValidatedJson<CreateDirectoryRequest>,
) -> Result<Json<ApiResponse<Directory>>, ApiError> {
    let ctx = state.context(principal, query.credential(), client).await;
    let dir = state
        .directory_service
        .create(&ctx, req.parent_id, &req.name)
        .await?;
    Ok(Json(ApiResponse::ok(dir)))
}

/// GET /api/directories/{id}
pub async fn get_directory(
    State(state): State<AppState>,
    MaybeAuthUser(principal): MaybeAuthUser,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
    Query(query): Query<ShareQuery>,
) -> Result<Json<ApiResponse<Directory>>, ApiError> {
    let ctx = state.context(principal, query.credential(), client).await;
    let dir = state.directory_service.get_directory(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(dir)))
}

/// PUT /api/directories/{id}
pub async fn rename_directory(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RenameDirectoryRequest>,
) -> Result<Json<ApiResponse<Directory>>, ApiError> {
    let ctx = state.context(auth.principal(), None, client).await;
    let dir = state.directory_service.rename(&ctx, id, &req.name).await?;
    Ok(Json(ApiResponse::ok(dir)))
}

/// PUT /api/directories/{id}/move
pub async fn move_directory(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<MoveDirectoryRequest>,
) -> Result<Json<ApiResponse<Directory>>, ApiError> {
    let ctx = state.context(auth.principal(), None, client).await;
    let dir = state
        .directory_service
        .move_directory(&ctx, id, req.parent_id)
        .await?;
    Ok(Json(ApiResponse::ok(dir)))
}

/// DELETE /api/directories/{id}
pub async fn delete_directory(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let ctx = state.context(auth.principal(), None, client).await;
    state.directory_service.delete(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Directory deleted"))))
}
