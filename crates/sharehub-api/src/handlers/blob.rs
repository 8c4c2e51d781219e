//! Redemption of local pre-signed links.

use axum::extract::{Path, State};
use axum::response::Response;

use sharehub_core::error::AppError;
use sharehub_service::StreamedFile;
use sharehub_storage::hygiene::content_disposition;

use crate::error::ApiError;
use crate::handlers::stream_response;
use crate::state::AppState;

/// GET /api/blobs/{token}
///
/// The token is the only credential; it was issued after an access check
/// and stays valid until it expires.
pub async fn redeem_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let link = state
        .links
        .redeem(&token)
        .ok_or_else(|| AppError::not_found("Download link not found or expired"))?;

    let meta = state.storage.metadata(&link.key).await?;
    let body = state.storage.read(&link.key).await?;

    stream_response(StreamedFile {
        content_type: link.content_type,
        content_length: meta.size_bytes,
        etag: meta.etag,
        content_disposition: content_disposition(&link.download_name, false),
        body,
    })
}
