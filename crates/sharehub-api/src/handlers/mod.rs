//! Route handlers organized by domain.

pub mod blob;
pub mod directory;
pub mod file;
pub mod health;
pub mod public;
pub mod quota;
pub mod share;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;

use sharehub_core::error::AppError;
use sharehub_service::delivery::{CACHE_CONTROL, NOSNIFF, ZIP_CONTENT_TYPE};
use sharehub_service::{Archive, StreamedFile};

use crate::error::ApiError;

/// Response carrying a proxied blob.
pub(crate) fn stream_response(file: StreamedFile) -> Result<Response, ApiError> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, header_value(&file.content_type)?)
        .header(header::CONTENT_LENGTH, file.content_length)
        .header(header::CONTENT_DISPOSITION, header_value(&file.content_disposition)?)
        .header(header::X_CONTENT_TYPE_OPTIONS, NOSNIFF)
        .header(header::CACHE_CONTROL, CACHE_CONTROL);
    if let Some(etag) = file
        .etag
        .as_deref()
        .and_then(|e| HeaderValue::from_str(&format!("\"{e}\"")).ok())
    {
        builder = builder.header(header::ETAG, etag);
    }

    builder
        .body(Body::from_stream(file.body))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")).into())
}

/// Response carrying a ZIP produced on the fly.
pub(crate) fn archive_response(archive: Archive) -> Result<Response, ApiError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ZIP_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, header_value(&archive.content_disposition)?)
        .header(header::X_CONTENT_TYPE_OPTIONS, NOSNIFF)
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .body(Body::from_stream(archive.body))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")).into())
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::internal(format!("Invalid header value: {e}")).into())
}
