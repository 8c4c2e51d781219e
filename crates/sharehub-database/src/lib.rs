//! # sharehub-database
//!
//! Entity store traits and their two implementations: PostgreSQL via sqlx
//! and an in-process store used by tests and local development.

pub mod connection;
pub mod memory;
pub mod postgres;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{
    AccessLogStore, DirectoryStore, FileStore, HealthCheck, ShareStore, Stores, UserStore,
};
