/// Post handlers - posts, comments and likes
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::db::{self, comment_repo, like_repo, post_repo};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{
    Comment, CommentIn, ErrorResponse, Like, LikeIn, Post, PostIn, PostSorting,
    PostWithComments, PostWithLikes,
};
use crate::services::{tasks, ImageJob};
use crate::AppState;

const POST_NOT_FOUND: &str = "Post not found";

#[derive(Debug, Deserialize, IntoParams)]
pub struct CreatePostQuery {
    /// Prompt for a generated illustration
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPostsQuery {
    /// `new` (default), `old` or `most_likes`
    #[serde(default)]
    #[param(inline)]
    pub sorting: PostSorting,
}

// ============================================================================
// Posts
// ============================================================================

/// Create a post, optionally scheduling image generation
#[utoipa::path(
    post,
    path = "/post",
    tag = "posts",
    params(CreatePostQuery),
    request_body = PostIn,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    query: web::Query<CreatePostQuery>,
    payload: web::Json<PostIn>,
) -> Result<HttpResponse> {
    let post = post_repo::create_post(&state.db, user.id, &payload.body).await?;
    tracing::info!(post_id = post.id, user_id = user.id, "Post created");

    let prompt = query
        .into_inner()
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    if let Some(prompt) = prompt {
        let post_url = req
            .url_for("get_post_with_comments", [post.id.to_string()])
            .map_err(|e| AppError::Internal(format!("Failed to build post URL: {e}")))?;

        tasks::spawn_image_generation(
            state.db.clone(),
            state.mailer.clone(),
            state.images.clone(),
            ImageJob {
                username: user.username.clone(),
                email: user.email.clone(),
                post_id: post.id,
                post_url: post_url.to_string(),
                prompt,
            },
        );
    }

    Ok(HttpResponse::Created().json(post))
}

/// List every post with its like count
#[utoipa::path(
    get,
    path = "/post",
    tag = "posts",
    params(ListPostsQuery),
    responses(
        (status = 200, description = "Posts in the requested order", body = [PostWithLikes]),
        (status = 422, description = "Unknown sorting", body = ErrorResponse)
    )
)]
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<ListPostsQuery>,
) -> Result<HttpResponse> {
    let posts = post_repo::list_posts_with_likes(&state.db, query.sorting).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// A post, its like count and its comments
#[utoipa::path(
    get,
    path = "/post/{post_id}",
    tag = "posts",
    params(("post_id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with comments", body = PostWithComments),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn get_post_with_comments(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = post_repo::find_post_with_likes(&state.db, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(POST_NOT_FOUND.to_string()))?;
    let comments = comment_repo::get_comments_by_post(&state.db, post_id).await?;

    Ok(HttpResponse::Ok().json(PostWithComments { post, comments }))
}

// ============================================================================
// Comments
// ============================================================================

/// Comment on a post
#[utoipa::path(
    post,
    path = "/comment",
    tag = "posts",
    request_body = CommentIn,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_comment(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<CommentIn>,
) -> Result<HttpResponse> {
    if !post_repo::post_exists(&state.db, payload.post_id).await? {
        return Err(AppError::NotFound(POST_NOT_FOUND.to_string()));
    }

    let comment =
        comment_repo::create_comment(&state.db, payload.post_id, user.id, &payload.body).await?;
    tracing::debug!(comment_id = comment.id, post_id = comment.post_id, "Comment created");

    Ok(HttpResponse::Created().json(comment))
}

/// Comments on a post, oldest first
#[utoipa::path(
    get,
    path = "/post/{post_id}/comments",
    tag = "posts",
    params(("post_id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comments on the post", body = [Comment])
    )
)]
pub async fn get_comments(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let comments = comment_repo::get_comments_by_post(&state.db, post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comments))
}

// ============================================================================
// Likes
// ============================================================================

/// Like a post (once per user)
#[utoipa::path(
    post,
    path = "/like",
    tag = "posts",
    request_body = LikeIn,
    responses(
        (status = 201, description = "Like recorded", body = Like),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse),
        (status = 409, description = "Post already liked", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn like_post(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<LikeIn>,
) -> Result<HttpResponse> {
    if !post_repo::post_exists(&state.db, payload.post_id).await? {
        return Err(AppError::NotFound(POST_NOT_FOUND.to_string()));
    }

    let like = like_repo::create_like(&state.db, payload.post_id, user.id)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                AppError::Conflict("Post already liked".to_string())
            } else {
                e.into()
            }
        })?;

    Ok(HttpResponse::Created().json(like))
}
