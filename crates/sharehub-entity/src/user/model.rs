//! User account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The slice of a user account ShareHub needs.
///
/// Registration and credentials live with the identity service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    /// Unique user identifier (the JWT `sub`).
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Per-user allowance in bytes; `None` uses the default, `0` is unlimited.
    pub storage_quota_bytes: Option<i64>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Effective allowance given the default from the settings snapshot.
    pub fn effective_quota(&self, default_quota_bytes: i64) -> i64 {
        self.storage_quota_bytes.unwrap_or(default_quota_bytes)
    }
}
