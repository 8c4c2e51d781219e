//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A file owned by a user.
///
/// `size_bytes` is authoritative for quota accounting and always matches
/// the blob stored under `storage_key`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// The owning user.
    pub owner_id: Uuid,
    /// Display name (including extension).
    pub name: String,
    /// Key of the backing blob. Globally unique and never changed.
    #[serde(skip_serializing)]
    pub storage_key: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type of the file.
    pub mime_type: String,
    /// Containing directory (`None` for the owner's root).
    pub directory_id: Option<Uuid>,
    /// Logical path, e.g. `/reports/q3.pdf`.
    pub path: String,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// When the file was last updated.
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Check whether the given user owns this file.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.name)
            .map(|ext| ext.to_lowercase())
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// Pre-generated identifier (also embedded in the storage key).
    pub id: Uuid,
    /// The file owner.
    pub owner_id: Uuid,
    /// Display name.
    pub name: String,
    /// Key of the already-written blob.
    pub storage_key: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub mime_type: String,
    /// Containing directory.
    pub directory_id: Option<Uuid>,
    /// Logical path.
    pub path: String,
}
