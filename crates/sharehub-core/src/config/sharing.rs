//! Share link and quota configuration.

use serde::{Deserialize, Serialize};

/// Share link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingConfig {
    /// Random bytes drawn per share token before base64 encoding.
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
    /// Minimum length of a share password.
    #[serde(default = "default_min_password")]
    pub min_password_length: usize,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            token_bytes: default_token_bytes(),
            min_password_length: default_min_password(),
        }
    }
}

/// Storage allowance applied to users without an override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Default allowance in bytes. `0` means unlimited.
    #[serde(default = "default_quota")]
    pub default_quota_bytes: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_quota_bytes: default_quota(),
        }
    }
}

fn default_token_bytes() -> usize {
    32
}

fn default_min_password() -> usize {
    4
}

fn default_quota() -> i64 {
    10_737_418_240 // 10 GB
}
