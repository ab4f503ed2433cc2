use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Contract for the local key-value store that backs drafts, profiles and the
/// pending-submission queue.
///
/// Values are opaque text blobs; callers own their encoding.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::QuotaExceeded` when the backend is full, or other
    /// storage errors.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Returns whether a value was present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// List keys starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Simple in-memory store for tests and throwaway sessions.
///
/// An optional byte quota (keys plus values) mimics browser storage limits.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            quota_bytes: Some(quota_bytes),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if let Some(quota) = self.quota_bytes {
            let others: usize = guard
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.remove(key).is_some())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut keys: Vec<String> = guard
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Holds the store behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove_round_trip() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));

        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
    }

    #[tokio::test]
    async fn quota_counts_replacement_not_accumulation() {
        let store = InMemoryStore::with_quota(10);
        store.set("k", "12345").await.unwrap();
        store.set("k", "123456789").await.unwrap();

        let err = store.set("k2", "123456789").await.unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 10, .. }));
        assert_eq!(store.get("k2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn lists_keys_by_prefix() {
        let store = InMemoryStore::new();
        store.set("ielts_test_2", "{}").await.unwrap();
        store.set("ielts_test_1", "{}").await.unwrap();
        store.set("ielts_user", "{}").await.unwrap();

        let keys = store.keys_with_prefix("ielts_test_").await.unwrap();
        assert_eq!(keys, vec!["ielts_test_1", "ielts_test_2"]);
    }
}
