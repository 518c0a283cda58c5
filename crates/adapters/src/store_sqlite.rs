//! SQLite posted-link store implementation

use async_trait::async_trait;
use pitchwire_domain::{LinkStoreError, PostedLinkStore};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;

/// SQLite-backed posted-link store with retention support
pub struct SqliteLinkStore {
    pool: SqlitePool,
}

impl SqliteLinkStore {
    /// Create a new SQLite link store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, LinkStoreError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| LinkStoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, LinkStoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| LinkStoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), LinkStoreError> {
        // Unix seconds keep range comparisons exact
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posted_links (
                link TEXT PRIMARY KEY,
                recorded_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LinkStoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_posted_links_recorded_at
            ON posted_links(recorded_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LinkStoreError::Database(e.to_string()))?;

        Ok(())
    }

    /// Number of stored links
    pub async fn count(&self) -> Result<i64, LinkStoreError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posted_links")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LinkStoreError::Database(e.to_string()))?;
        Ok(count.0)
    }
}

#[async_trait]
impl PostedLinkStore for SqliteLinkStore {
    async fn contains(&self, link: &str) -> Result<bool, LinkStoreError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posted_links WHERE link = ?")
            .bind(link.trim())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LinkStoreError::Database(e.to_string()))?;

        Ok(count.0 > 0)
    }

    async fn record(&self, link: &str, at: OffsetDateTime) -> Result<(), LinkStoreError> {
        sqlx::query(
            r#"
            INSERT INTO posted_links (link, recorded_at)
            VALUES (?, ?)
            ON CONFLICT(link) DO NOTHING
            "#,
        )
        .bind(link.trim())
        .bind(at.unix_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| LinkStoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn prune_before(&self, cutoff: OffsetDateTime) -> Result<usize, LinkStoreError> {
        let result = sqlx::query("DELETE FROM posted_links WHERE recorded_at < ?")
            .bind(cutoff.unix_timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| LinkStoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}
