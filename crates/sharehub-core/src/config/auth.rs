//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Bearer token verification settings.
///
/// ShareHub only verifies tokens; issuing them belongs to the identity
/// service in front of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT verification (HMAC-SHA256).
    pub jwt_secret: String,
    /// Expected `iss` claim. Empty disables the issuer check.
    #[serde(default)]
    pub jwt_issuer: String,
    /// Clock skew tolerance in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

fn default_leeway() -> u64 {
    30
}
