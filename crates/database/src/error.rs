use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Invalid mirror database url: {0}")]
    ConnectionConfigError(String),

    #[error("Mirror database error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Mirror migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Mirrored log is not a valid JSON array of lines: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Mirror store is unavailable: {0}")]
    Unavailable(String),
}
