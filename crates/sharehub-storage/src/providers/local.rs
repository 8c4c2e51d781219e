//! Local filesystem blob store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use sharehub_core::error::{AppError, ErrorKind};
use sharehub_core::result::AppResult;
use sharehub_core::traits::storage::{ByteStream, StorageObjectMeta, StorageProvider};

use crate::hygiene::validate_storage_key;
use crate::presign::PresignedLinks;

/// Local filesystem storage provider.
///
/// Pre-signed URLs point back at this server's `/api/blobs/{token}` route.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Root directory for all stored blobs.
    root: PathBuf,
    /// Base URL used to build pre-signed links.
    public_url: String,
    /// Outstanding pre-signed links.
    links: Arc<PresignedLinks>,
}

impl LocalStorageProvider {
    /// Create a new local storage provider rooted at the given path.
    pub async fn new(
        root_path: impl AsRef<Path>,
        public_url: &str,
        links: Arc<PresignedLinks>,
    ) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
            links,
        })
    }

    /// Resolve a key to an absolute path within the root.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        validate_storage_key(key)?;
        Ok(self.root.join(key))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

fn open_error(key: &str, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Blob not found: {key}"))
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to open blob: {key}"), e)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn read(&self, key: &str) -> AppResult<ByteStream> {
        let full_path = self.resolve(key)?;
        let file = fs::File::open(&full_path)
            .await
            .map_err(|e| open_error(key, e))?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn write(&self, key: &str, data: Bytes) -> AppResult<()> {
        let full_path = self.resolve(key)?;
        self.ensure_parent(&full_path).await?;

        fs::write(&full_path, &data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write blob: {key}"), e)
        })?;

        debug!(key, bytes = data.len(), "Wrote blob");
        Ok(())
    }

    async fn write_stream(&self, key: &str, mut stream: ByteStream) -> AppResult<u64> {
        let full_path = self.resolve(key)?;
        self.ensure_parent(&full_path).await?;

        let mut file = fs::File::create(&full_path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to create blob: {key}"), e)
        })?;

        let mut total_bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    if let Err(cleanup) = fs::remove_file(&full_path).await {
                        warn!(key, error = %cleanup, "Failed to remove partial blob");
                    }
                    return Err(AppError::with_source(ErrorKind::Storage, "Stream read error", e));
                }
            };
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to write chunk", e)
            })?;
        }

        file.flush()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush blob", e))?;

        debug!(key, bytes = total_bytes, "Wrote blob from stream");
        Ok(total_bytes)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_path = self.resolve(key)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete blob: {key}"),
                e,
            )),
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let full_path = self.resolve(key)?;
        Ok(fs::try_exists(&full_path).await.unwrap_or(false))
    }

    async fn metadata(&self, key: &str) -> AppResult<StorageObjectMeta> {
        let full_path = self.resolve(key)?;
        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| open_error(key, e))?;

        let modified = meta.modified().ok();
        let etag = modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| format!("{:x}-{:x}", meta.len(), d.as_nanos()));

        Ok(StorageObjectMeta {
            key: key.to_string(),
            size_bytes: meta.len(),
            mime_type: None,
            last_modified: modified.map(chrono::DateTime::<chrono::Utc>::from),
            etag,
        })
    }

    async fn presigned_url(
        &self,
        key: &str,
        ttl: Duration,
        download_name: &str,
        content_type: &str,
    ) -> AppResult<String> {
        validate_storage_key(key)?;
        let token = self.links.issue(key, ttl, download_name, content_type);
        Ok(format!("{}/api/blobs/{token}", self.public_url))
    }
}
