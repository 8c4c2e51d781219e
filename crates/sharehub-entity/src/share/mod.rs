//! Share domain entities.

pub mod access_log;
pub mod model;

pub use access_log::{AccessAction, CreateAccessLog, ShareAccessLog};
pub use model::{CreateShare, PermissionType, ResourceType, Share, ShareAccess};
