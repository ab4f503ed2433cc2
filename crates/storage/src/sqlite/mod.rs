use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{KeyValueStore, Storage};

mod kv_repo;
mod migrate;

const FILE_POOL_SIZE: u32 = 4;

/// `SQLite`-backed key-value store for drafts, the profile and the pending queue.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// True for URLs whose database lives only as long as its connection.
fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

impl SqliteStore {
    /// Connect and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid, the database cannot be
    /// opened, or a migration fails.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Connect without migrating. Missing database files are created.
    ///
    /// In-memory databases get a single long-lived connection so every query
    /// sees the same entries.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid or the database cannot
    /// be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool_options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(5));
        let pool = if is_in_memory(database_url) {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            pool_options
                .max_connections(FILE_POOL_SIZE)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };
        Ok(Self { pool })
    }

    /// Create the `kv_entries` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by an opened `SqliteStore`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(database_url).await?);
        Ok(Self { kv })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteStore>();
    }

    #[test]
    fn memory_urls_are_detected() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite:file:drafts?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite:///home/jane/exam.sqlite3"));
    }
}
