//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sharehub_entity::share::{PermissionType, ResourceType, Share};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

impl MessageResponse {
    /// Creates a message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A share as shown to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    /// Share ID.
    pub id: Uuid,
    /// Kind of resource.
    pub resource_type: ResourceType,
    /// Resource ID.
    pub resource_id: Uuid,
    /// Granted permission.
    pub permission_type: PermissionType,
    /// Share token.
    pub token: String,
    /// Public URL of the share.
    pub url: String,
    /// Whether a password is required.
    pub has_password: bool,
    /// Expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Times the share has been used.
    pub access_count: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ShareResponse {
    /// Build from a share and the server's public base URL.
    pub fn from_share(share: Share, public_url: &str) -> Self {
        Self {
            url: format!(
                "{}/api/public/share/{}",
                public_url.trim_end_matches('/'),
                share.token
            ),
            has_password: share.has_password(),
            id: share.id,
            resource_type: share.resource_type,
            resource_id: share.resource_id,
            permission_type: share.permission_type,
            token: share.token,
            expires_at: share.expires_at,
            access_count: share.access_count,
            created_at: share.created_at,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Blob store reachable.
    pub storage: bool,
    /// Metadata database reachable.
    pub database: bool,
}
