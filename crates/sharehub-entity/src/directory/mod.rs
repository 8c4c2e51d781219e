//! Directory domain entities.

pub mod model;

pub use model::{CreateDirectory, Directory, join_path};
