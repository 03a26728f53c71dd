use crate::models::User;
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, username, email, password_hash, confirmed, created_at";

/// Insert a new, unconfirmed user
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Find a user by email (the token subject)
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Find a user by username
pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Find a user by login identifier, matching either email or username
pub async fn find_by_login(pool: &PgPool, login: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE email = $1 OR username = $1
        ORDER BY (email = $1) DESC
        LIMIT 1
        "#
    ))
    .bind(login)
    .fetch_optional(pool)
    .await
}

/// Whether the username or the email is already registered
pub async fn username_or_email_taken(
    pool: &PgPool,
    username: &str,
    email: &str,
) -> Result<bool, sqlx::Error> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)",
    )
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(taken)
}

/// Set the confirmation flag; returns false when no user has that email
pub async fn set_confirmed(pool: &PgPool, email: &str, confirmed: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET confirmed = $2
        WHERE email = $1
        "#,
    )
    .bind(email)
    .bind(confirmed)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
