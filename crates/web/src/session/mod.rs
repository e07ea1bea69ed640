//! Server-side sessions keyed by an opaque cookie.
//!
//! The browser only ever holds a random id in the `mib_session` cookie. The
//! record behind it (user copy, timestamps, active flag) lives in a
//! [`SessionStore`]. Expiry is absolute: reads refresh `last_accessed` but
//! never move `expires_at`.

mod redis_store;
mod store;

use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use mib_core::identity::SessionUser;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

pub use self::redis_store::RedisSessionStore;
pub use self::store::{MemorySessionStore, SessionStore, StoreError};
use crate::config::WebConfig;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "mib_session";

/// Session lifetime in seconds (24 hours).
pub const SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

const SESSION_ID_LEN: usize = 32;

/// Stored session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub user: SessionUser,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
}

impl SessionRecord {
    /// Fresh active record expiring one session lifetime from `now`.
    #[must_use]
    pub fn new(session_id: String, user: SessionUser, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            user,
            created_at: now,
            last_accessed: now,
            expires_at: now + chrono::Duration::seconds(SESSION_TTL_SECONDS),
            active: true,
        }
    }

    /// A record is usable while active and not yet expired.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.active && now < self.expires_at
    }

    /// Time left before the absolute expiry, floored at one second.
    #[must_use]
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        let secs = (self.expires_at - now).num_seconds().max(1);
        Duration::from_secs(secs.unsigned_abs())
    }
}

/// Create the configured store: Redis when `SESSION_STORE_URL` is set,
/// otherwise an in-process map.
///
/// # Errors
///
/// Returns an error if the Redis URL is malformed.
pub fn store_from_config(config: &WebConfig) -> Result<Arc<dyn SessionStore>, StoreError> {
    match &config.session_store_url {
        Some(url) => {
            let store = RedisSessionStore::new(url)?;
            tracing::info!("Using Redis session store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!(
                "SESSION_STORE_URL not set, sessions are kept in memory and lost on restart"
            );
            Ok(Arc::new(MemorySessionStore::new()))
        }
    }
}

/// Creates, reads and destroys sessions on top of a [`SessionStore`].
///
/// Every method takes the request's [`CookieJar`] and returns the jar to send
/// back, so handlers only need to include it in their response.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    secure_cookie: bool,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, secure_cookie: bool) -> Self {
        Self {
            store,
            secure_cookie,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Start a session for `user`, replacing whatever session the browser
    /// currently holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot delete the old record or persist
    /// the new one.
    pub async fn create_session(
        &self,
        jar: CookieJar,
        user: SessionUser,
    ) -> Result<(CookieJar, String), StoreError> {
        if let Some(old) = jar.get(SESSION_COOKIE) {
            self.store.delete(old.value()).await?;
        }

        let id = generate_session_id();
        let record = SessionRecord::new(id.clone(), user, Utc::now());
        self.store
            .set(&id, &record, record.remaining_ttl(record.created_at))
            .await?;

        tracing::info!(
            session_id = %id,
            user_id = %record.user.id,
            provisional = record.user.provisional,
            "Session created"
        );

        Ok((jar.add(self.session_cookie(id.clone())), id))
    }

    /// Load the session referenced by the cookie.
    ///
    /// Stale cookies (missing, undecodable, inactive or expired records) are
    /// cleared and their records deleted. A valid record has `last_accessed`
    /// refreshed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    pub async fn get_session(
        &self,
        jar: CookieJar,
    ) -> Result<(CookieJar, Option<SessionRecord>), StoreError> {
        let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Ok((jar, None));
        };

        let record = match self.store.get(&id).await {
            Ok(Some(record)) => record,
            Ok(None) | Err(StoreError::Corrupt(_)) => {
                tracing::debug!(session_id = %id, "Session cookie references no usable record");
                self.store.delete(&id).await?;
                return Ok((Self::clear_cookie(jar), None));
            }
            Err(e) => return Err(e),
        };

        let now = Utc::now();
        if !record.is_valid(now) {
            tracing::debug!(session_id = %id, "Session expired or inactive");
            self.store.delete(&id).await?;
            return Ok((Self::clear_cookie(jar), None));
        }

        let record = SessionRecord {
            last_accessed: now,
            ..record
        };
        self.store.set(&id, &record, record.remaining_ttl(now)).await?;

        Ok((jar, Some(record)))
    }

    /// End the session referenced by the cookie. No cookie means nothing to
    /// do, and nothing is set on the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot delete the record.
    pub async fn destroy_session(&self, jar: CookieJar) -> Result<CookieJar, StoreError> {
        let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Ok(jar);
        };

        // Mark inactive first so a failed delete cannot leave a live record
        match self.store.get(&id).await {
            Ok(Some(mut record)) => {
                record.active = false;
                let ttl = record.remaining_ttl(Utc::now());
                self.store.set(&id, &record, ttl).await?;
            }
            Ok(None) | Err(StoreError::Corrupt(_)) => {}
            Err(e) => return Err(e),
        }

        self.store.delete(&id).await?;
        tracing::info!(session_id = %id, "Session destroyed");

        Ok(Self::clear_cookie(jar))
    }

    /// Whether the cookie references a valid session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    pub async fn is_authenticated(&self, jar: CookieJar) -> Result<(CookieJar, bool), StoreError> {
        let (jar, session) = self.get_session(jar).await?;
        Ok((jar, session.is_some()))
    }

    fn session_cookie(&self, id: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, id))
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(cookie::time::Duration::seconds(SESSION_TTL_SECONDS))
            .build()
    }

    fn clear_cookie(jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }
}

/// Generate an opaque session id of 32 alphanumeric characters.
fn generate_session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}
