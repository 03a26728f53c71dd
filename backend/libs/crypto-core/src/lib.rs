//! # Crypto Core
//!
//! Shared cryptographic helpers for the social API.
//!
//! ## Modules
//! - `jwt`: HS256 access and confirmation tokens
//! - `password`: Argon2id password hashing

pub mod jwt;
pub mod password;

pub use jwt::{TokenError, TokenType};
pub use password::PasswordError;
