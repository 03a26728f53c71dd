/// Social API Library
///
/// A small social-posting backend: users register and confirm their email,
/// log in with bearer tokens, write posts (optionally illustrated by a
/// generated image), comment, like, and upload files to a bucket.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `models`: Data structures for users, posts, comments, likes
/// - `services`: Mail, image generation, storage and background tasks
/// - `db`: Database access layer and migrations
/// - `middleware`: Current-user extractor
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `telemetry`: Tracing setup and email obfuscation
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};

use services::{EmailService, ImageGenerationClient, ObjectStore};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared state handed to every handler as `web::Data<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub mailer: EmailService,
    pub images: ImageGenerationClient,
    pub storage: Arc<dyn ObjectStore>,
}
