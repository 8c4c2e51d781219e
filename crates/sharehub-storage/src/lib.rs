//! # sharehub-storage
//!
//! Blob store providers for ShareHub: the local filesystem (with
//! token-based pre-signed links) and S3-compatible object stores behind the
//! `s3` feature. Also hosts the key and file-name hygiene rules every
//! provider relies on.

pub mod hygiene;
pub mod mime;
pub mod presign;
pub mod providers;

use std::sync::Arc;

use tracing::info;

use sharehub_core::config::storage::{StorageBackend, StorageConfig};
use sharehub_core::error::AppError;
use sharehub_core::result::AppResult;
use sharehub_core::traits::storage::StorageProvider;

pub use presign::{PresignedLink, PresignedLinks};
pub use providers::LocalStorageProvider;

/// The configured blob store plus the local link registry.
///
/// `links` is only populated by the local provider; the HTTP layer redeems
/// its tokens.
#[derive(Debug, Clone)]
pub struct BlobBackend {
    /// The provider used for all blob I/O.
    pub provider: Arc<dyn StorageProvider>,
    /// Registry of local pre-signed links.
    pub links: Arc<PresignedLinks>,
}

impl BlobBackend {
    /// Build the provider selected by configuration.
    ///
    /// `public_url` is the externally reachable base URL of this server,
    /// used to build local pre-signed links.
    pub async fn from_config(config: &StorageConfig, public_url: &str) -> AppResult<Self> {
        let links = Arc::new(PresignedLinks::new());
        let provider: Arc<dyn StorageProvider> = match config.provider {
            StorageBackend::Local => Arc::new(
                LocalStorageProvider::new(&config.local.root_path, public_url, links.clone())
                    .await?,
            ),
            #[cfg(feature = "s3")]
            StorageBackend::S3 => {
                Arc::new(providers::s3::S3StorageProvider::new(&config.s3).await?)
            }
            #[cfg(not(feature = "s3"))]
            StorageBackend::S3 => {
                return Err(AppError::configuration(
                    "storage.provider = \"s3\" requires the `s3` feature",
                ));
            }
        };

        info!(provider = provider.provider_type(), "Blob store initialized");
        Ok(Self { provider, links })
    }
}
