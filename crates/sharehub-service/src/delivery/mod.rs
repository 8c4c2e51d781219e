//! Content delivery: pre-signed redirects, proxied streams and ZIP archives.

pub mod archive;
pub mod engine;

use sharehub_core::traits::storage::ByteStream;

pub use engine::DeliveryEngine;

/// `X-Content-Type-Options` value sent with every proxied download.
pub const NOSNIFF: &str = "nosniff";

/// `Cache-Control` value sent with every proxied download.
pub const CACHE_CONTROL: &str = "private, must-revalidate";

/// Content type of archive downloads.
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// How a single file should reach the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadMode {
    /// Send the client a time-limited URL on the blob store.
    #[default]
    Redirect,
    /// Proxy the bytes through this server.
    Stream {
        /// `inline` instead of `attachment` disposition.
        inline: bool,
    },
}

/// Outcome of a single file download.
#[derive(Debug)]
pub enum Delivery {
    /// Redirect the client to a pre-signed URL.
    Redirect {
        /// The pre-signed URL.
        url: String,
    },
    /// Stream the blob in the response body.
    Stream(StreamedFile),
}

/// A blob ready to be written to a response.
pub struct StreamedFile {
    /// MIME type recorded at upload.
    pub content_type: String,
    /// Exact byte length.
    pub content_length: u64,
    /// Entity tag from the blob store.
    pub etag: Option<String>,
    /// Ready-made `Content-Disposition` header value.
    pub content_disposition: String,
    /// The blob bytes.
    pub body: ByteStream,
}

impl std::fmt::Debug for StreamedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamedFile")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .field("content_disposition", &self.content_disposition)
            .finish_non_exhaustive()
    }
}

/// A ZIP archive produced on the fly.
pub struct Archive {
    /// Name the client should save the archive as.
    pub file_name: String,
    /// Ready-made `Content-Disposition` header value.
    pub content_disposition: String,
    /// Number of entries queued for the archive.
    pub entry_count: usize,
    /// Archive bytes, produced as the client reads them.
    pub body: ByteStream,
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("file_name", &self.file_name)
            .field("entry_count", &self.entry_count)
            .finish_non_exhaustive()
    }
}
