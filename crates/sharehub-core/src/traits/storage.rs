//! Blob store trait for pluggable file content backends.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// Metadata about a stored blob.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageObjectMeta {
    /// Key within the storage provider.
    pub key: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// MIME type (if known).
    pub mime_type: Option<String>,
    /// Last modified timestamp.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
    /// Entity tag, without surrounding quotes.
    pub etag: Option<String>,
}

/// A byte stream type used for reading blob contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for key-addressed blob stores.
///
/// Keys are validated by the caller before they reach a provider.
/// Implementations exist for the local filesystem and S3.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Open a blob as a byte stream.
    async fn read(&self, key: &str) -> AppResult<ByteStream>;

    /// Write bytes to a blob at the given key.
    async fn write(&self, key: &str, data: Bytes) -> AppResult<()>;

    /// Write a byte stream to a blob at the given key, returning bytes written.
    async fn write_stream(&self, key: &str, stream: ByteStream) -> AppResult<u64>;

    /// Delete the blob at the given key.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether a blob exists at the given key.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Get metadata about a blob.
    async fn metadata(&self, key: &str) -> AppResult<StorageObjectMeta>;

    /// Produce a time-limited URL from which the blob can be fetched directly.
    ///
    /// `download_name` is the file name the client should save the blob as,
    /// and `content_type` the MIME type the link answers with.
    async fn presigned_url(
        &self,
        key: &str,
        ttl: Duration,
        download_name: &str,
        content_type: &str,
    ) -> AppResult<String>;
}
