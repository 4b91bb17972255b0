//! SQLite-backed store for fetched quotes.
//!
//! Records are append-only: the server inserts one row per persisted quote
//! and nothing in the application ever updates or deletes them. `id` and
//! `timestamp` are assigned by SQLite.

use chrono::NaiveDateTime;
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::error::PersistError;

#[derive(Clone)]
pub struct QuoteStore {
    pool: SqlitePool,
}

/// One stored quote row.
#[derive(Debug, Clone, FromRow)]
pub struct QuoteRecord {
    pub id: i64,
    pub bid: String,
    pub timestamp: NaiveDateTime,
}

impl QuoteStore {
    /// Opens the database at `path`, creating file and schema if missing.
    pub async fn open(path: &Path) -> Result<Self, PersistError> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory database for tests.
    pub async fn open_in_memory() -> Result<Self, PersistError> {
        // A single connection keeps every query on the same :memory: database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), PersistError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cotacoes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bid TEXT,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Appends one quote record, bounded by `deadline`.
    ///
    /// The bid is stored verbatim; no format validation happens here.
    pub async fn save(&self, bid: &str, deadline: Duration) -> Result<(), PersistError> {
        let insert = sqlx::query("INSERT INTO cotacoes (bid) VALUES (?)")
            .bind(bid)
            .execute(&self.pool);

        timeout(deadline, insert)
            .await
            .map_err(|_| PersistError::DeadlineExceeded(deadline))??;

        debug!(bid, "Stored quote");
        Ok(())
    }

    /// Most recently inserted record, if any.
    pub async fn latest(&self) -> Result<Option<QuoteRecord>, PersistError> {
        let record = sqlx::query_as::<_, QuoteRecord>(
            "SELECT id, bid, timestamp FROM cotacoes ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn count(&self) -> Result<i64, PersistError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cotacoes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Closes the underlying pool; any write after this fails.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
