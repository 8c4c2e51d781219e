//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use sharehub_entity::share::ResourceType;
use sharehub_service::ShareCredential;

/// Share credential sent as query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareQuery {
    /// Share token.
    pub share_token: Option<String>,
    /// Share password.
    pub password: Option<String>,
}

impl ShareQuery {
    /// The credential, if a token was sent.
    pub fn credential(self) -> Option<ShareCredential> {
        ShareCredential::from_parts(self.share_token, self.password)
    }
}

/// Query for `GET /files/{id}/download`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileDownloadQuery {
    /// Share token.
    pub share_token: Option<String>,
    /// Share password.
    pub password: Option<String>,
    /// Proxy the bytes instead of redirecting.
    #[serde(default)]
    pub stream: bool,
    /// `inline` disposition when streaming.
    #[serde(default)]
    pub inline: bool,
}

/// Body of `POST /files/download/batch`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchDownloadRequest {
    /// Files to include.
    #[validate(length(min = 1, max = 1000, message = "Between 1 and 1000 files may be requested"))]
    pub file_ids: Vec<Uuid>,
    /// Directory the selection was made in; names the archive.
    pub directory_id: Option<Uuid>,
    /// Share token.
    pub share_token: Option<String>,
    /// Share password.
    pub password: Option<String>,
}

/// Query for `POST /files/upload`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadQuery {
    /// Target directory; omitted for the uploader's root.
    pub directory_id: Option<Uuid>,
    /// Share token.
    pub share_token: Option<String>,
    /// Share password.
    pub password: Option<String>,
}

/// Body of `PUT /files/{id}/move`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MoveFileRequest {
    /// Destination directory; `null` for the owner's root.
    pub directory_id: Option<Uuid>,
}

/// Body of `POST /directories`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDirectoryRequest {
    /// Parent directory; `null` for the owner's root.
    pub parent_id: Option<Uuid>,
    /// Directory name.
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Body of `PUT /directories/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenameDirectoryRequest {
    /// New name.
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Body of `PUT /directories/{id}/move`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MoveDirectoryRequest {
    /// New parent; `null` for the owner's root.
    pub parent_id: Option<Uuid>,
}

/// Body of `POST /shares`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateShareRequest {
    /// Kind of resource.
    pub resource_type: ResourceType,
    /// Resource ID.
    pub resource_id: Uuid,
    /// `read`, `upload_only` or `read_upload`.
    #[validate(length(min = 1, message = "permission_type is required"))]
    pub permission_type: String,
    /// Optional password.
    #[validate(length(max = 1024))]
    pub password: Option<String>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Body of `PATCH /shares/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateShareRequest {
    /// New expiry; `null` removes it.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Query for `GET /shares`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareListQuery {
    /// Only shares of this resource type.
    pub resource_type: Option<ResourceType>,
}

/// Query for `GET /shares/{id}/access-log`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessLogQuery {
    /// Most entries returned.
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}

fn default_log_limit() -> i64 {
    100
}

/// Query for `GET /public/share/{token}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicShareQuery {
    /// Share password.
    pub password: Option<String>,
}

/// Body of `POST /public/share/{token}/validate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ShareVerifyRequest {
    /// Share password.
    pub password: Option<String>,
}
