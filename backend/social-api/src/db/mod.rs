/// Database access layer
///
/// Repositories are free functions over a `PgPool`; each issues one query
/// and returns `sqlx::Error` for the handler layer to map.
///
/// - `user_repo`: accounts and confirmation state
/// - `post_repo`: posts, listings with like counts, image attachment
/// - `comment_repo`: comments per post
/// - `like_repo`: one like per (post, user)
pub mod comment_repo;
pub mod like_repo;
pub mod post_repo;
pub mod user_repo;

use sqlx::migrate::Migrator;
use sqlx::PgPool;

/// Embedded schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Wipe every table and restart id sequences
///
/// Used when `DB_FORCE_ROLL_BACK` is set, at startup and between tests.
pub async fn reset_database(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("TRUNCATE TABLE likes, comments, posts, users RESTART IDENTITY CASCADE")
        .execute(pool)
        .await?;

    tracing::debug!("Database tables truncated");
    Ok(())
}

/// True when the error is a unique-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Lightweight connectivity probe used by health checks
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
