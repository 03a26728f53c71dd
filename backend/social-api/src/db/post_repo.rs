use crate::models::{Post, PostSorting, PostWithLikes};
use sqlx::PgPool;

/// Create a post without an image
pub async fn create_post(pool: &PgPool, user_id: i64, body: &str) -> Result<Post, sqlx::Error> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (user_id, body)
        VALUES ($1, $2)
        RETURNING id, body, user_id, image_url, created_at
        "#,
    )
    .bind(user_id)
    .bind(body)
    .fetch_one(pool)
    .await?;

    Ok(post)
}

/// Find a post by id together with its like count
pub async fn find_post_with_likes(
    pool: &PgPool,
    post_id: i64,
) -> Result<Option<PostWithLikes>, sqlx::Error> {
    sqlx::query_as::<_, PostWithLikes>(
        r#"
        SELECT p.id, p.body, p.user_id, p.image_url, p.created_at, COUNT(l.id) AS likes
        FROM posts p
        LEFT OUTER JOIN likes l ON l.post_id = p.id
        WHERE p.id = $1
        GROUP BY p.id
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

/// Every post with its like count, in the requested order
pub async fn list_posts_with_likes(
    pool: &PgPool,
    sorting: PostSorting,
) -> Result<Vec<PostWithLikes>, sqlx::Error> {
    // ORDER BY comes from a fixed set of clauses, never from user input
    let sql = format!(
        r#"
        SELECT p.id, p.body, p.user_id, p.image_url, p.created_at, COUNT(l.id) AS likes
        FROM posts p
        LEFT OUTER JOIN likes l ON l.post_id = p.id
        GROUP BY p.id
        ORDER BY {}
        "#,
        sorting.order_by()
    );

    sqlx::query_as::<_, PostWithLikes>(&sql).fetch_all(pool).await
}

/// Whether a post with this id exists
pub async fn post_exists(pool: &PgPool, post_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
        .bind(post_id)
        .fetch_one(pool)
        .await
}

/// Attach a generated image to a post
pub async fn set_image_url(pool: &PgPool, post_id: i64, image_url: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE posts
        SET image_url = $2
        WHERE id = $1
        "#,
    )
    .bind(post_id)
    .bind(image_url)
    .execute(pool)
    .await?;

    Ok(())
}
