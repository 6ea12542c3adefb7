use crate::error::MirrorError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// A process-wide keyed store for mirrored log buffers.
///
/// Implementations only ever see whole snapshots: `save` replaces whatever was
/// stored under `key`, `load` returns the last saved snapshot.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    async fn save(&self, key: &str, lines: &[String]) -> Result<(), MirrorError>;

    /// Returns `None` when nothing was ever saved under `key`.
    async fn load(&self, key: &str) -> Result<Option<Vec<String>>, MirrorError>;
}

/// The durable backend: one row per key in the `log_mirror` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new `SqliteStore` over an already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and applies migrations.
    pub async fn open(database_url: &str) -> Result<Self, MirrorError> {
        let pool = crate::connection::connect(database_url).await?;
        crate::connection::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MirrorStore for SqliteStore {
    async fn save(&self, key: &str, lines: &[String]) -> Result<(), MirrorError> {
        let encoded = serde_json::to_string(lines)?;

        sqlx::query(
            r#"
            INSERT INTO log_mirror (scope_key, lines, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (scope_key) DO UPDATE
            SET lines = excluded.lines, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(encoded)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<String>>, MirrorError> {
        let row = sqlx::query("SELECT lines FROM log_mirror WHERE scope_key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let encoded: String = row.try_get("lines")?;
                Ok(Some(serde_json::from_str(&encoded)?))
            }
            None => Ok(None),
        }
    }
}

/// A non-durable store for tests and for running without a database.
///
/// `set_read_only(true)` makes every `save` fail, the way a full disk
/// would. `set_unreadable(true)` does the same for `load`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<String>>>,
    read_only: AtomicBool,
    unreadable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn set_unreadable(&self, unreadable: bool) {
        self.unreadable.store(unreadable, Ordering::SeqCst);
    }

    /// Writes `lines` directly, bypassing the read-only switch.
    pub fn seed(&self, key: &str, lines: Vec<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), lines);
    }
}

#[async_trait]
impl MirrorStore for MemoryStore {
    async fn save(&self, key: &str, lines: &[String]) -> Result<(), MirrorError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(MirrorError::Unavailable("storage quota exceeded".to_string()));
        }
        self.seed(key, lines.to_vec());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<String>>, MirrorError> {
        if self.unreadable.load(Ordering::SeqCst) {
            return Err(MirrorError::Unavailable("mirror cannot be read".to_string()));
        }
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }
}
