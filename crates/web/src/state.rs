//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::BackendClient;
use crate::config::WebConfig;
use crate::memberstack::MemberstackClient;
use crate::session::{SessionManager, SessionStore};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// session manager and the upstream API clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    sessions: SessionManager,
    memberstack: MemberstackClient,
    backend: BackendClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Web configuration
    /// * `store` - Session store chosen at startup
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: WebConfig, store: Arc<dyn SessionStore>) -> Result<Self, StateError> {
        let sessions = SessionManager::new(store, config.secure_cookies());
        let memberstack = MemberstackClient::new(&config.memberstack)?;
        let backend = BackendClient::new(&config.backend)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions,
                memberstack,
                backend,
            }),
        })
    }

    /// Get a reference to the web configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the session manager.
    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    /// Get a reference to the identity vendor admin client.
    #[must_use]
    pub fn memberstack(&self) -> &MemberstackClient {
        &self.inner.memberstack
    }

    /// Get a reference to the analytics backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }
}
