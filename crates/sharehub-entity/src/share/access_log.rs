//! Append-only share access log.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What a share holder did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccessAction {
    /// Looked at the share landing information.
    View,
    /// Downloaded content.
    Download,
    /// Uploaded content.
    Upload,
}

impl fmt::Display for AccessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::Download => write!(f, "download"),
            Self::Upload => write!(f, "upload"),
        }
    }
}

/// A single recorded access through a share.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShareAccessLog {
    /// Unique entry identifier.
    pub id: Uuid,
    /// The share that was used.
    pub share_id: Uuid,
    /// What was done.
    pub action: AccessAction,
    /// Client IP address, if known.
    pub ip_address: Option<String>,
    /// Client user agent, if sent.
    pub user_agent: Option<String>,
    /// File involved, if any.
    pub file_name: Option<String>,
    /// When the access happened.
    pub accessed_at: DateTime<Utc>,
}

/// Data for a new access log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccessLog {
    /// The share that was used.
    pub share_id: Uuid,
    /// What was done.
    pub action: AccessAction,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// File involved.
    pub file_name: Option<String>,
}
