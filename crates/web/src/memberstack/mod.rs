//! Identity vendor admin API client.
//!
//! Looks members up by id or email with the secret admin key of an explicit
//! [`VendorEnv`]. Lookups never fail the caller: any transport, status or
//! decode problem is logged and reported as "no member", and the login
//! handlers decide how to fall back.

mod types;

use std::sync::Arc;

use mib_core::identity::{Member, VendorEnv};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use crate::config::MemberstackConfig;
use types::{Envelope, RawMember};

/// Errors from the admin API. Absorbed inside this module.
#[derive(Debug, Error)]
enum MemberstackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Admin API returned {0}")]
    Status(reqwest::StatusCode),

    #[error("No admin key configured for {0}")]
    MissingKey(VendorEnv),
}

/// Client for the vendor's admin REST API.
#[derive(Clone)]
pub struct MemberstackClient {
    inner: Arc<MemberstackClientInner>,
}

struct MemberstackClientInner {
    client: reqwest::Client,
    admin_url: String,
    production_key: SecretString,
    staging_key: Option<SecretString>,
    default_env: VendorEnv,
}

impl MemberstackClient {
    /// Create a new admin API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &MemberstackConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("mib-web/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(MemberstackClientInner {
                client,
                admin_url: config.admin_url.clone(),
                production_key: config.production_key.clone(),
                staging_key: config.staging_key.clone(),
                default_env: config.default_env,
            }),
        })
    }

    /// Environment used when a request does not name one.
    #[must_use]
    pub fn default_env(&self) -> VendorEnv {
        self.inner.default_env
    }

    /// Look a member up by vendor id.
    pub async fn get_member_by_id(&self, id: &str, env: VendorEnv) -> Option<Member> {
        self.lookup(id, env).await
    }

    /// Look a member up by email address.
    pub async fn get_member_by_email(&self, email: &str, env: VendorEnv) -> Option<Member> {
        self.lookup(email, env).await
    }

    #[instrument(skip(self), fields(env = %env))]
    async fn lookup(&self, id_or_email: &str, env: VendorEnv) -> Option<Member> {
        match self.fetch_member(id_or_email, env).await {
            Ok(member) => {
                tracing::debug!(member_id = %member.id, "Member found");
                Some(member)
            }
            Err(MemberstackError::Status(status)) if status == reqwest::StatusCode::NOT_FOUND => {
                tracing::info!("Member not found");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Member lookup failed");
                None
            }
        }
    }

    async fn fetch_member(&self, id_or_email: &str, env: VendorEnv) -> Result<Member, MemberstackError> {
        let key = self.key_for(env)?;
        let url = format!(
            "{}/members/{}",
            self.inner.admin_url,
            urlencoding::encode(id_or_email)
        );

        let response = self
            .inner
            .client
            .get(&url)
            .header("X-API-KEY", key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MemberstackError::Status(status));
        }

        let envelope: Envelope<RawMember> = response.json().await?;
        Ok(envelope.data.into())
    }

    fn key_for(&self, env: VendorEnv) -> Result<&SecretString, MemberstackError> {
        match env {
            VendorEnv::Production => Ok(&self.inner.production_key),
            VendorEnv::Staging => self
                .inner
                .staging_key
                .as_ref()
                .ok_or(MemberstackError::MissingKey(env)),
        }
    }
}
