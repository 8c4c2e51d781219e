//! File download, upload, metadata, delete and move handlers.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use bytes::Bytes;
use uuid::Uuid;

use sharehub_core::error::AppError;
use sharehub_entity::file::File;
use sharehub_service::file::UploadParams;
use sharehub_service::{Delivery, DownloadMode, ShareCredential};

use crate::dto::request::{
    BatchDownloadRequest, FileDownloadQuery, MoveFileRequest, ShareQuery, UploadQuery,
};
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, MaybeAuthUser, ValidatedJson};
use crate::handlers::{archive_response, stream_response};
use crate::state::AppState;

/// GET /api/files/{id}/download
pub async fn download_file(
    State(state): State<AppState>,
    MaybeAuthUser(principal): MaybeAuthUser,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
    Query(query): Query<FileDownloadQuery>,
) -> Result<Response, ApiError> {
    let mode = if query.stream {
        DownloadMode::Stream {
            inline: query.inline,
        }
    } else {
        DownloadMode::Redirect
    };
    let credential = ShareCredential::from_parts(query.share_token, query.password);
    let ctx = state.context(principal, credential, client).await;

    match state.delivery_engine.download_file(&ctx, id, mode).await? {
        Delivery::Redirect { url } => Ok(Redirect::temporary(&url).into_response()),
        Delivery::Stream(file) => stream_response(file),
    }
}

/// POST /api/files/download/batch
pub async fn download_batch(
    State(state): State<AppState>,
    MaybeAuthUser(principal): MaybeAuthUser,
    ClientInfo(client): ClientInfo,
    ValidatedJson(req): ValidatedJson<BatchDownloadRequest>,
) -> Result<Response, ApiError> {
    let credential = ShareCredential::from_parts(req.share_token, req.password);
    let ctx = state.context(principal, credential, client).await;

    let archive = state
        .delivery_engine
        .download_batch(&ctx, &req.file_ids, req.directory_id)
        .await?;
    archive_response(archive)
}

/// POST /api/files/upload (multipart, field `file`)
pub async fn upload_file(
    State(state): State<AppState>,
    MaybeAuthUser(principal): MaybeAuthUser,
    ClientInfo(client): ClientInfo,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<File>>, ApiError> {
    let mut upload: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
        upload = Some((file_name, content_type, data));
    }

    let (file_name, content_type, data) =
        upload.ok_or_else(|| AppError::validation("Missing multipart field 'file'"))?;

    let credential = ShareCredential::from_parts(query.share_token, query.password);
    let ctx = state.context(principal, credential, client).await;
    let file = state
        .file_service
        .upload(
            &ctx,
            UploadParams {
                directory_id: query.directory_id,
                file_name,
                content_type,
                data,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(file)))
}

/// GET /api/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    MaybeAuthUser(principal): MaybeAuthUser,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
    Query(query): Query<ShareQuery>,
) -> Result<Json<ApiResponse<File>>, ApiError> {
    let ctx = state.context(principal, query.credential(), client).await;
    let file = state.file_service.get_file(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(file)))
}

/// DELETE /api/files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let ctx = state.context(auth.principal(), None, client).await;
    state.file_service.delete(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("File deleted"))))
}

/// PUT /api/files/{id}/move
pub async fn move_file(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<MoveFileRequest>,
) -> Result<Json<ApiResponse<File>>, ApiError> {
    let ctx = state.context(auth.principal(), None, client).await;
    let file = state
        .file_service
        .move_file(&ctx, id, req.directory_id)
        .await?;
    Ok(Json(ApiResponse::ok(file)))
}
