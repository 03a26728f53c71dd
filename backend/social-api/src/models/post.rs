use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// ============================================================================
// Posts
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostIn {
    pub body: String,
}

/// Stored post row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Post {
    pub id: i64,
    pub body: String,
    pub user_id: i64,
    /// Set once background image generation succeeds
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Post together with its like count
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PostWithLikes {
    pub id: i64,
    pub body: String,
    pub user_id: i64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostWithComments {
    pub post: PostWithLikes,
    pub comments: Vec<Comment>,
}

/// Ordering for the post listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PostSorting {
    /// Newest first
    #[default]
    New,
    /// Oldest first
    Old,
    /// Most liked first, ties newest first
    MostLikes,
}

impl PostSorting {
    /// `ORDER BY` clause for the aggregated listing query
    pub fn order_by(&self) -> &'static str {
        match self {
            PostSorting::New => "p.id DESC",
            PostSorting::Old => "p.id ASC",
            PostSorting::MostLikes => "likes DESC, p.id DESC",
        }
    }
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentIn {
    pub body: String,
    pub post_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub post_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Likes
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct LikeIn {
    pub post_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Like {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}
