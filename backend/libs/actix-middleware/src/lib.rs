//! # Actix Middleware Library
//!
//! Shared request plumbing for the social API actix service
//!
//! ## Modules
//! - `jwt_auth`: bearer token extractors
//! - `correlation_id`: request correlation IDs

pub mod correlation_id;
pub mod jwt_auth;

pub use correlation_id::{CorrelationId, CorrelationIdMiddleware};
pub use jwt_auth::{AccessSubject, AuthError, BearerToken};
