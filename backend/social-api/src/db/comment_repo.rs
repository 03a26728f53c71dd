use crate::models::Comment;
use sqlx::PgPool;

/// Create a new comment on a post
pub async fn create_comment(
    pool: &PgPool,
    post_id: i64,
    user_id: i64,
    body: &str,
) -> Result<Comment, sqlx::Error> {
    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (post_id, user_id, body)
        VALUES ($1, $2, $3)
        RETURNING id, body, post_id, user_id, created_at
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(body)
    .fetch_one(pool)
    .await?;

    Ok(comment)
}

/// All comments on a post, oldest first
pub async fn get_comments_by_post(pool: &PgPool, post_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
    let comments = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, body, post_id, user_id, created_at
        FROM comments
        WHERE post_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}
