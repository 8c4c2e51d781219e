//! Share link lifecycle: creation, validation, expiry, revocation and the
//! access log.

pub mod service;

pub use service::{CreateShareParams, PublicShareInfo, ShareService};
