//! # sharehub-service
//!
//! Business logic service layer for ShareHub. Each service orchestrates the
//! entity stores, the blob store and the auth primitives to implement one
//! application-level concern.
//!
//! Services follow constructor injection: all dependencies are provided at
//! construction time via `Arc` references.

pub mod context;
pub mod delivery;
pub mod directory;
pub mod file;
pub mod permission;
pub mod quota;
pub mod share;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{ClientMeta, RequestContext, ShareCredential};
pub use delivery::{Archive, Delivery, DeliveryEngine, DownloadMode, StreamedFile};
pub use directory::DirectoryService;
pub use file::FileService;
pub use permission::PermissionResolver;
pub use quota::QuotaTracker;
pub use share::ShareService;
