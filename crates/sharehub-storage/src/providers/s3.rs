//! S3-compatible object storage provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use bytes::{Bytes, BytesMut};
use futures::stream::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use sharehub_core::config::storage::S3StorageConfig;
use sharehub_core::error::{AppError, ErrorKind};
use sharehub_core::result::AppResult;
use sharehub_core::traits::storage::{ByteStream, StorageObjectMeta, StorageProvider};

use crate::hygiene::{content_disposition, validate_storage_key};

/// S3-compatible storage provider (AWS S3, MinIO, and similar).
#[derive(Debug, Clone)]
pub struct S3StorageProvider {
    client: Arc<Client>,
    bucket: String,
}

impl S3StorageProvider {
    /// Create a new S3 storage provider.
    ///
    /// Static credentials are used when an access key is configured;
    /// otherwise the default AWS credential chain applies.
    pub async fn new(config: &S3StorageConfig) -> AppResult<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::configuration("storage.s3.bucket is required"));
        }
        info!(
            bucket = %config.bucket,
            region = %config.region,
            "Initializing S3 storage provider"
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                &config.access_key,
                &config.secret_key,
                None,
                None,
                "sharehub",
            ));
        }
        let aws_config = loader.load().await;

        let mut builder = S3ConfigBuilder::from(&aws_config);
        if !config.endpoint.is_empty() {
            debug!(endpoint = %config.endpoint, "Using custom S3 endpoint");
            builder = builder.endpoint_url(&config.endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Arc::new(Client::from_conf(builder.build())),
            bucket: config.bucket.clone(),
        })
    }
}

fn s3_error(context: impl Into<String>, e: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::with_source(ErrorKind::Storage, context, e)
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok())
    }

    async fn read(&self, key: &str) -> AppResult<ByteStream> {
        validate_storage_key(key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("Blob not found: {key}"))
                } else {
                    s3_error(format!("Failed to read blob: {key}"), e)
                }
            })?;

        Ok(Box::pin(ReaderStream::new(output.body.into_async_read())))
    }

    async fn write(&self, key: &str, data: Bytes) -> AppResult<()> {
        validate_storage_key(key)?;
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(S3ByteStream::from(data))
            .send()
            .await
            .map_err(|e| s3_error(format!("Failed to write blob: {key}"), e))?;
        debug!(key, bytes = len, "Wrote blob");
        Ok(())
    }

    async fn write_stream(&self, key: &str, mut stream: ByteStream) -> AppResult<u64> {
        // TODO: switch to multipart upload so large uploads are not buffered.
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| s3_error("Stream read error", e))?;
            buffer.extend_from_slice(&chunk);
        }
        let total = buffer.len() as u64;
        self.write(key, buffer.freeze()).await?;
        Ok(total)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        validate_storage_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| s3_error(format!("Failed to delete blob: {key}"), e))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        validate_storage_key(key)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(s3_error(format!("Failed to stat blob: {key}"), e)),
        }
    }

    async fn metadata(&self, key: &str) -> AppResult<StorageObjectMeta> {
        validate_storage_key(key)?;
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    AppError::not_found(format!("Blob not found: {key}"))
                } else {
                    s3_error(format!("Failed to stat blob: {key}"), e)
                }
            })?;

        Ok(StorageObjectMeta {
            key: key.to_string(),
            size_bytes: head.content_length().unwrap_or(0).max(0) as u64,
            mime_type: head.content_type().map(str::to_string),
            last_modified: head
                .last_modified()
                .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
            etag: head.e_tag().map(|t| t.trim_matches('"').to_string()),
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
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| s3_error("Invalid pre-signed URL lifetime", e))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(content_disposition(download_name, false))
            .response_content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| s3_error(format!("Failed to presign blob: {key}"), e))?;
        Ok(request.uri().to_string())
    }
}
