/// SQLite-backed record storage
use crate::{
    error::{DropError, DropResult},
    record_store::{KeyPage, RecordBackend},
};
use async_trait::async_trait;
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::path::Path;

/// Record backend over a single SQLite key-value table
#[derive(Clone)]
pub struct SqliteRecordBackend {
    pool: SqlitePool,
}

impl SqliteRecordBackend {
    /// Open (creating if necessary) the record database at `path`
    pub async fn connect(path: &Path) -> DropResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        let backend = Self { pool };
        backend.ensure_schema().await?;
        Ok(backend)
    }

    /// Wrap an existing pool (tests use `:memory:` pools)
    pub async fn from_pool(pool: SqlitePool) -> DropResult<Self> {
        let backend = Self { pool };
        backend.ensure_schema().await?;
        Ok(backend)
    }

    async fn ensure_schema(&self) -> DropResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RecordBackend for SqliteRecordBackend {
    async fn get(&self, key: &str) -> DropResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM records WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_get("value"))
            .transpose()
            .map_err(DropError::Database)
    }

    async fn put(&self, key: &str, value: &str) -> DropResult<()> {
        sqlx::query(
            r#"
            INSERT INTO records (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> DropResult<KeyPage> {
        // Keyset pagination: strictly-after the cursor, in key order
        let after = cursor.unwrap_or("");
        let rows = sqlx::query(
            r#"
            SELECT key FROM records
            WHERE key LIKE ?1 || '%' AND key > ?2
            ORDER BY key
            LIMIT ?3
            "#,
        )
        .bind(prefix)
        .bind(after)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            keys.push(row.try_get("key")?);
        }

        // A full page may have more behind it; a short page is the end
        let cursor = if keys.len() == limit {
            keys.last().cloned()
        } else {
            None
        };

        Ok(KeyPage { keys, cursor })
    }
}
