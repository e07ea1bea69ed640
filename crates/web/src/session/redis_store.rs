//! Redis-backed session store.
//!
//! Records are stored as JSON (timestamps as ISO-8601 strings) under
//! `session:{id}` with `SET EX`, so Redis evicts them on its own once the
//! session duration has passed.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use secrecy::{ExposeSecret, SecretString};

use super::SessionRecord;
use super::store::{SessionStore, StoreError};

const KEY_PREFIX: &str = "session:";

/// Session store backed by a Redis server.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
}

impl RedisSessionStore {
    /// Create a store from a connection URL. Does not connect yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not a valid Redis URL.
    pub fn new(url: &SecretString) -> Result<Self, StoreError> {
        let client = redis::Client::open(url.expose_secret())?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn key(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn set(&self, id: &str, record: &SessionRecord, ttl: Duration) -> Result<(), StoreError> {
        let value = serde_json::to_string(record)?;
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(Self::key(id), value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(Self::key(id)).await?;

        value
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| {
                    tracing::warn!(error = %e, "Undecodable session record");
                    StoreError::Corrupt(id.to_string())
                })
            })
            .transpose()
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(Self::key(id)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn test_key_prefix() {
        assert_eq!(RedisSessionStore::key("abc123"), "session:abc123");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(RedisSessionStore::new(&SecretString::from("not a url")).is_err());
    }

    #[tokio::test]
    #[ignore = "Requires a running Redis at REDIS_TEST_URL"]
    async fn test_redis_store_roundtrip() {
        let url = std::env::var("REDIS_TEST_URL").unwrap_or_else(|_| "redis://127.0.0.1/".into());
        let store = RedisSessionStore::new(&SecretString::from(url)).unwrap();
        store.ping().await.unwrap();

        let record = test_support::record("redis-roundtrip", chrono::Duration::hours(1));
        store
            .set("redis-roundtrip", &record, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("redis-roundtrip").await.unwrap(), Some(record));

        store.delete("redis-roundtrip").await.unwrap();
        assert_eq!(store.get("redis-roundtrip").await.unwrap(), None);
    }
}
