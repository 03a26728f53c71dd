/// Data models for the social API
///
/// - `user`: accounts, registration payloads and token responses
/// - `post`: posts, comments and likes
pub mod post;
pub mod user;

use serde::Serialize;
use utoipa::ToSchema;

pub use post::{
    Comment, CommentIn, Like, LikeIn, Post, PostIn, PostSorting, PostWithComments, PostWithLikes,
};
pub use user::{Credentials, TokenResponse, User, UserIn};

/// Plain `{"detail": ...}` acknowledgement body
#[derive(Debug, Serialize, ToSchema)]
pub struct DetailResponse {
    pub detail: String,
}

impl DetailResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Error body produced by [`crate::error::AppError`]
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
    pub status: u16,
}
