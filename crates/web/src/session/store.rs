//! Session storage abstraction and the in-process implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::SessionRecord;

/// Errors from a session store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis command or connection failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Record could not be serialized for storage.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A stored value could not be decoded back into a record.
    #[error("Corrupt session record: {0}")]
    Corrupt(String),
}

/// Key-value storage for session records.
///
/// Implementations are chosen once at startup and injected as
/// `Arc<dyn SessionStore>`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a record under `id`. Stores that support expiry evict it after
    /// `ttl`.
    async fn set(&self, id: &str, record: &SessionRecord, ttl: Duration) -> Result<(), StoreError>;

    /// Load a record. `Ok(None)` when absent.
    ///
    /// Returns [`StoreError::Corrupt`] when something is stored but does not
    /// decode.
    async fn get(&self, id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Remove a record. Removing a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Process-local store for development.
///
/// No TTL enforcement: an expired record stays in memory until the next
/// lookup of its id notices the expiry and deletes it.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    records: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, id: &str, record: &SessionRecord, _ttl: Duration) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(id.to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        let record = test_support::record("abc", chrono::Duration::hours(1));

        store.set("abc", &record, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("abc").await.unwrap(), Some(record));
        assert_eq!(store.len().await, 1);

        store.delete("abc").await.unwrap();
        assert_eq!(store.get("abc").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_delete_missing_is_ok() {
        let store = MemorySessionStore::new();
        assert!(store.delete("nope").await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_store_keeps_expired_records() {
        let store = MemorySessionStore::new();
        let expired = test_support::record("old", chrono::Duration::hours(-1));
        store.set("old", &expired, Duration::from_secs(1)).await.unwrap();
        assert!(store.get("old").await.unwrap().is_some());
    }
}
