//! Share entity model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use sharehub_core::AppError;

/// Kind of resource a share points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "resource_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A single file.
    File,
    /// A directory and everything below it.
    Directory,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// What a share link allows its holder to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_permission", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Download only.
    Read,
    /// Upload into the shared directory, no downloads.
    UploadOnly,
    /// Both download and upload.
    ReadUpload,
}

impl PermissionType {
    /// Whether holders may download content.
    pub fn allows_read(&self) -> bool {
        matches!(self, Self::Read | Self::ReadUpload)
    }

    /// Whether holders may upload content.
    pub fn allows_upload(&self) -> bool {
        matches!(self, Self::UploadOnly | Self::ReadUpload)
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::UploadOnly => write!(f, "upload_only"),
            Self::ReadUpload => write!(f, "read_upload"),
        }
    }
}

impl FromStr for PermissionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "upload_only" => Ok(Self::UploadOnly),
            "read_upload" => Ok(Self::ReadUpload),
            other => Err(AppError::validation(format!(
                "Unknown permission type: {other}"
            ))),
        }
    }
}

/// A share link granting access to a file or directory.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Share {
    /// Unique share identifier.
    pub id: Uuid,
    /// User who created (and owns) the share.
    pub owner_id: Uuid,
    /// Type of resource being shared.
    pub resource_type: ResourceType,
    /// ID of the shared resource.
    pub resource_id: Uuid,
    /// Permission granted to holders.
    pub permission_type: PermissionType,
    /// URL-safe access token.
    pub token: String,
    /// Argon2 hash of the share password.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// When the share stops being valid.
    pub expires_at: Option<DateTime<Utc>>,
    /// Number of successful accesses.
    pub access_count: i64,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
    /// When the share was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Share {
    /// Whether the share has passed its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the share is expired at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Whether a password is required.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// The metadata handed to a successfully validated holder.
    pub fn to_access(&self) -> ShareAccess {
        ShareAccess {
            share_id: self.id,
            owner_id: self.owner_id,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            permission_type: self.permission_type,
            expires_at: self.expires_at,
        }
    }
}

/// Result of validating a share token. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareAccess {
    /// The share that was validated.
    pub share_id: Uuid,
    /// The user billed for uploads through this share.
    #[serde(skip_serializing)]
    pub owner_id: Uuid,
    /// Type of shared resource.
    pub resource_type: ResourceType,
    /// ID of shared resource.
    pub resource_id: Uuid,
    /// Granted permission.
    pub permission_type: PermissionType,
    /// Expiration, if any.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Data required to create a new share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShare {
    /// Owning user.
    pub owner_id: Uuid,
    /// Type of resource.
    pub resource_type: ResourceType,
    /// ID of the resource.
    pub resource_id: Uuid,
    /// Permission granted.
    pub permission_type: PermissionType,
    /// Pre-generated unique token.
    pub token: String,
    /// Argon2 hash of the password, if any.
    pub password_hash: Option<String>,
    /// Expiry time (`None` = never).
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn share(expires_at: Option<DateTime<Utc>>) -> Share {
        Share {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            resource_type: ResourceType::File,
            resource_id: Uuid::new_v4(),
            permission_type: PermissionType::Read,
            token: "tok".into(),
            password_hash: Some("$argon2id$...".into()),
            expires_at,
            access_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_expiry_is_strictly_after() {
        let at = Utc::now();
        let s = share(Some(at));
        assert!(!s.is_expired_at(at));
        assert!(s.is_expired_at(at + Duration::seconds(1)));
        assert!(!share(None).is_expired());
    }

    #[test]
    fn test_permission_parsing() {
        assert_eq!("read".parse::<PermissionType>().unwrap(), PermissionType::Read);
        assert_eq!(
            "upload_only".parse::<PermissionType>().unwrap(),
            PermissionType::UploadOnly
        );
        assert!("admin".parse::<PermissionType>().is_err());
        assert!(!PermissionType::UploadOnly.allows_read());
        assert!(!PermissionType::Read.allows_upload());
    }

    #[test]
    fn test_access_view_omits_hash() {
        let json = serde_json::to_value(share(None).to_access()).unwrap();
        assert!(json.get("password_hash").is_none());
        let json = serde_json::to_value(share(None)).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
