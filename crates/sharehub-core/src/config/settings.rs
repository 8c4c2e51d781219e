//! Per-request runtime settings snapshot.

use serde::{Deserialize, Serialize};

use super::AppConfig;

/// Operator-tunable values read once per request.
///
/// Handlers clone the current snapshot and pass it explicitly to the quota
/// and permission code, so a single request never observes two different
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Allowance for users without a per-user override. `0` means unlimited.
    pub default_quota_bytes: i64,
    /// Largest single upload accepted, in bytes.
    pub max_upload_size_bytes: u64,
    /// Whether new share links may be created.
    pub sharing_enabled: bool,
}

impl RuntimeSettings {
    /// Build the initial snapshot from static configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_quota_bytes: config.quota.default_quota_bytes,
            max_upload_size_bytes: config.storage.max_upload_size_bytes,
            sharing_enabled: true,
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            default_quota_bytes: 0,
            max_upload_size_bytes: u64::MAX,
            sharing_enabled: true,
        }
    }
}
