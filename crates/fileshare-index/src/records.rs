//! SQLite-backed record store
//!
//! One table maps identifier to expiration time and display name. The schema
//! is kept byte-compatible with earlier deployments of the service, so an
//! existing `index.db` can be reused as-is.

use crate::types::FileRecord;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS SharedFiles \
    (uuid CHAR(36) PRIMARY KEY, expires INTEGER NOT NULL, name VARCHAR(255))";

/// Transactional table of file records, keyed by identifier.
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    /// Open (creating if missing) the database file at `path`.
    pub async fn connect(path: &Path) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Create the table if it does not exist. Idempotent, never destructive.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        debug!("record schema ensured");
        Ok(())
    }

    pub async fn insert(&self, id: &str, expires_at: i64, name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO SharedFiles (uuid, expires, name) VALUES (?, ?, ?)")
            .bind(id)
            .bind(expires_at)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<FileRecord>, sqlx::Error> {
        let row = sqlx::query("SELECT uuid, expires, name FROM SharedFiles WHERE uuid = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(FileRecord {
                id: row.try_get("uuid")?,
                expires_at: row.try_get("expires")?,
                // Column is nullable in the legacy schema
                name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
            })),
            None => Ok(None),
        }
    }

    pub async fn exists(&self, id: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM SharedFiles WHERE uuid = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM SharedFiles")
            .fetch_one(&self.pool)
            .await
    }

    /// Delete every record whose expiration is strictly before `now`, in a
    /// single transaction. Either all qualifying records go or none do.
    /// Returns the number of records removed.
    pub async fn delete_expired(&self, now: i64) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM SharedFiles")
            .fetch_one(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM SharedFiles WHERE expires < ?")
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(
            before,
            removed = result.rows_affected(),
            "expired record sweep committed"
        );
        Ok(result.rows_affected())
    }

    /// Close the connection pool. Operations after this fail rather than
    /// silently succeeding.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
