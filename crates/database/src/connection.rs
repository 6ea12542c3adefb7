use crate::error::MirrorError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Opens the SQLite pool backing the log mirror.
///
/// File databases are created on first use. An in-memory database only lives as
/// long as its connection, so for `sqlite::memory:` the pool is pinned to one
/// connection that is never recycled.
pub async fn connect(database_url: &str) -> Result<SqlitePool, MirrorError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| MirrorError::ConnectionConfigError(format!("{}: {}", database_url, e)))?
        .create_if_missing(true);

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?
    };

    Ok(pool)
}

/// Applies the embedded migrations so the `log_mirror` table exists.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MirrorError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
