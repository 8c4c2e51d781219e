//! # sharehub-auth
//!
//! Identity and credential primitives for ShareHub.
//!
//! ## Modules
//!
//! - `jwt`: HS256 bearer token verification (and issuing, for tooling and tests)
//! - `password`: Argon2id hashing of share passwords
//! - `principal`: who is making a request
//! - `token`: random URL-safe share tokens

pub mod jwt;
pub mod password;
pub mod principal;
pub mod token;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use password::PasswordHasher;
pub use principal::Principal;
pub use token::TokenGenerator;
