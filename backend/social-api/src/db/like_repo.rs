use crate::models::Like;
use sqlx::PgPool;

/// Record a like
///
/// A repeated like for the same (post, user) pair fails with a unique
/// violation from the `likes_post_user_key` constraint.
pub async fn create_like(pool: &PgPool, post_id: i64, user_id: i64) -> Result<Like, sqlx::Error> {
    let like = sqlx::query_as::<_, Like>(
        r#"
        INSERT INTO likes (post_id, user_id)
        VALUES ($1, $2)
        RETURNING id, post_id, user_id, created_at
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(like)
}
