//! Directory entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A directory in a user's hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Directory {
    /// Unique directory identifier.
    pub id: Uuid,
    /// The owning user.
    pub owner_id: Uuid,
    /// Directory name.
    pub name: String,
    /// Parent directory ID (`None` for top-level directories).
    pub parent_id: Option<Uuid>,
    /// Full materialized path (e.g., `/documents/reports`).
    pub path: String,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
    /// When the directory was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Directory {
    /// Check if this is a top-level directory (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check whether the given user owns this directory.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Path of a direct child with the given name.
    pub fn child_path(&self, name: &str) -> String {
        join_path(&self.path, name)
    }
}

/// Join a parent path and a child name into a materialized path.
///
/// The owner's root is the empty parent path.
pub fn join_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// Data required to create a new directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDirectory {
    /// The directory owner.
    pub owner_id: Uuid,
    /// Parent directory (`None` for top level).
    pub parent_id: Option<Uuid>,
    /// Directory name.
    pub name: String,
    /// Full materialized path.
    pub path: String,
}
