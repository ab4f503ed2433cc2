use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{KeyValueStore, StorageError};

use super::SqliteStore;

fn connection_error(err: &sqlx::Error) -> StorageError {
    StorageError::Connection(err.to_string())
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| connection_error(&err))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let value: String = row
            .try_get("value")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| connection_error(&err))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|err| connection_error(&err))?;
        Ok(result.rows_affected() > 0)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT key FROM kv_entries WHERE substr(key, 1, ?2) = ?1 ORDER BY key")
            .bind(prefix)
            .bind(i64::try_from(prefix.chars().count()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|err| connection_error(&err))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("key")
                    .map_err(|err| StorageError::Serialization(err.to_string()))
            })
            .collect()
    }
}
