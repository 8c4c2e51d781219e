//! # sharehub-entity
//!
//! Domain entity models for ShareHub. Every struct in this crate represents
//! a database table row or a domain value object. Database entities derive
//! `sqlx::FromRow`; enums stored in Postgres derive `sqlx::Type`.

pub mod directory;
pub mod file;
pub mod quota;
pub mod share;
pub mod user;
