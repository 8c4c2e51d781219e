//! Request context carrying the principal, share credential, client
//! metadata and settings snapshot.

use serde::{Deserialize, Serialize};

use sharehub_auth::Principal;
use sharehub_core::config::settings::RuntimeSettings;

/// A share token presented with a request, plus its password if any.
#[derive(Clone, Serialize, Deserialize)]
pub struct ShareCredential {
    /// The share token.
    pub token: String,
    /// Plaintext password supplied by the holder.
    pub password: Option<String>,
}

impl ShareCredential {
    /// Build a credential from optional request parameters.
    ///
    /// Returns `None` when no token (or an empty one) was sent.
    pub fn from_parts(token: Option<String>, password: Option<String>) -> Option<Self> {
        token.filter(|t| !t.is_empty()).map(|token| Self {
            token,
            password: password.filter(|p| !p.is_empty()),
        })
    }
}

impl std::fmt::Debug for ShareCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareCredential")
            .field("token", &"<redacted>")
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

/// Where a request came from, for the share access log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientMeta {
    /// Client IP address.
    pub ip_address: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
}

/// Context for the current request.
///
/// Built by the HTTP layer and passed into service methods so that every
/// operation knows who is acting, with which share credential, and under
/// which settings.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The authenticated user, or anonymous.
    pub principal: Principal,
    /// Share credential sent with the request.
    pub share: Option<ShareCredential>,
    /// Client metadata.
    pub client: ClientMeta,
    /// Settings snapshot taken when the request arrived.
    pub settings: RuntimeSettings,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(
        principal: Principal,
        share: Option<ShareCredential>,
        client: ClientMeta,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            principal,
            share,
            client,
            settings,
        }
    }

    /// The authenticated user, or an unauthorized error.
    pub fn require_user(&self) -> sharehub_core::AppResult<uuid::Uuid> {
        self.principal
            .user_id()
            .ok_or_else(|| sharehub_core::AppError::unauthorized("Authentication required"))
    }
}
