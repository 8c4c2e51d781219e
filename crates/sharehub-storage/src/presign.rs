//! Token registry backing pre-signed links for the local provider.
//!
//! The local filesystem has no native URL signing, so a link is a random
//! token mapped to a key and an expiry. Tokens stay redeemable until they
//! expire, mirroring S3 pre-signed URLs.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;

/// What a link token resolves to.
#[derive(Debug, Clone)]
pub struct PresignedLink {
    /// Blob key.
    pub key: String,
    /// Name the client should save the blob as.
    pub download_name: String,
    /// MIME type recorded for the file.
    pub content_type: String,
    /// When the link stops working.
    pub expires_at: DateTime<Utc>,
}

/// Concurrent map of outstanding link tokens.
#[derive(Debug, Default)]
pub struct PresignedLinks {
    links: DashMap<String, PresignedLink>,
}

impl PresignedLinks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link and return its token.
    pub fn issue(
        &self,
        key: &str,
        ttl: Duration,
        download_name: &str,
        content_type: &str,
    ) -> String {
        self.purge_expired();

        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);

        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.links.insert(
            token.clone(),
            PresignedLink {
                key: key.to_string(),
                download_name: download_name.to_string(),
                content_type: content_type.to_string(),
                expires_at,
            },
        );
        token
    }

    /// Resolve a token if it exists and has not expired.
    pub fn redeem(&self, token: &str) -> Option<PresignedLink> {
        let link = self.links.get(token)?.clone();
        if Utc::now() > link.expires_at {
            self.links.remove(token);
            return None;
        }
        Some(link)
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Utc::now();
        self.links.retain(|_, link| link.expires_at >= now);
    }

    /// Number of outstanding links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no links are outstanding.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
