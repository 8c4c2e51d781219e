//! File upload, delete and move.

pub mod service;

pub use service::{FileService, UploadParams};
