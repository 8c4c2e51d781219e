//! Access decisions for owners and share-token holders.

pub mod resolver;

pub use resolver::PermissionResolver;
