//! Custom Axum extractors.

pub mod auth;
pub mod client;
pub mod pagination;
pub mod validated;

pub use auth::{AuthUser, MaybeAuthUser};
pub use client::ClientInfo;
pub use pagination::PaginationParams;
pub use validated::ValidatedJson;
