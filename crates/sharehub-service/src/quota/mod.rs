//! Storage quota accounting.

pub mod tracker;

pub use tracker::QuotaTracker;
