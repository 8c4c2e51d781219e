//! Directory tree management.

pub mod service;

pub use service::DirectoryService;
