//! Analytics backend client.
//!
//! Proxies report sections, school lists and address search, and fetches a
//! user's order history for quota accounting. The shared API token is added
//! here and never reaches the browser.
//!
//! Report sections degrade instead of failing: any upstream problem yields
//! [`Section::Unavailable`]. Available sections are cached in memory via
//! `moka` (5-minute TTL) keyed by the full upstream URL.

mod types;

pub use types::{AddressSuggestion, ReportKind, Schools, Section};

use std::sync::Arc;
use std::time::Duration;

use mib_core::entitlement::OrderRecord;
use moka::future::Cache;
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::BackendConfig;
use types::{AddressResponse, OrdersResponse};

/// Errors from backend calls that have no degraded form.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("Backend returned {0}")]
    Status(reqwest::StatusCode),

    /// Base URL and path did not form a valid URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Addresses served when search is down and the sample fallback is enabled.
const SAMPLE_ADDRESSES: &[(&str, &str, &str, &str)] = &[
    ("1 Macquarie Street, Sydney NSW 2000", "Sydney", "NSW", "2000"),
    ("200 Bourke Street, Melbourne VIC 3000", "Melbourne", "VIC", "3000"),
    ("10 Eagle Street, Brisbane City QLD 4000", "Brisbane City", "QLD", "4000"),
    ("25 King William Street, Adelaide SA 5000", "Adelaide", "SA", "5000"),
    ("100 St Georges Terrace, Perth WA 6000", "Perth", "WA", "6000"),
];

/// Client for the analytics backend.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: secrecy::SecretString,
    address_sample_fallback: bool,
    cache: Cache<String, Section>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("mib-web/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                address_sample_fallback: config.address_sample_fallback,
                cache,
            }),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.inner.base_url)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_text(&self, url: Url) -> Result<String, BackendError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status));
        }
        Ok(response.text().await?)
    }

    // =========================================================================
    // Report sections
    // =========================================================================

    /// Fetch one report section. `blur` asks the backend for the teaser
    /// rendering shown to users without a paid plan.
    #[instrument(skip(self, kind), fields(kind = %kind))]
    pub async fn fetch_section(
        &self,
        kind: ReportKind,
        section: &str,
        name: &str,
        blur: bool,
    ) -> Section {
        let report = format!("{}_report", kind.as_str());
        let mut url = match self.url(&[&report, "graphs", section, name]) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Could not build section URL");
                return Section::Unavailable;
            }
        };
        url.query_pairs_mut()
            .append_pair("token", self.inner.api_key.expose_secret())
            .append_pair("blur", if blur { "true" } else { "false" });

        let cache_key = url.to_string();
        if let Some(cached) = self.inner.cache.get(&cache_key).await {
            tracing::debug!("Section cache hit");
            return cached;
        }

        let section = match self.get_text(url).await {
            Ok(body) => Section::from_body(&body),
            Err(e) => {
                tracing::warn!(error = %e, "Report section unavailable");
                Section::Unavailable
            }
        };

        if section.is_available() {
            self.inner.cache.insert(cache_key, section.clone()).await;
        }

        section
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Fetch a user's order history.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable, answers with a
    /// non-success status, or the body is not an order list.
    #[instrument(skip(self))]
    pub async fn fetch_orders(&self, email: &str) -> Result<Vec<OrderRecord>, BackendError> {
        let mut url = self.url(&["user_orders", email])?;
        url.query_pairs_mut()
            .append_pair("token", self.inner.api_key.expose_secret());

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status));
        }

        let orders: OrdersResponse = response.json().await?;
        Ok(orders.into_orders())
    }

    // =========================================================================
    // Schools
    // =========================================================================

    /// Fetch private and public school lists for a suburb concurrently.
    #[instrument(skip(self))]
    pub async fn fetch_schools(&self, suburb: &str) -> Schools {
        let (private, public) = tokio::join!(
            self.fetch_school_list("private", suburb),
            self.fetch_school_list("public", suburb),
        );
        Schools { private, public }
    }

    async fn fetch_school_list(&self, sector: &str, suburb: &str) -> Section {
        let url = match self.url(&["suburb_report", "schools", sector, suburb]) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Could not build schools URL");
                return Section::Unavailable;
            }
        };

        match self.get_text(url).await {
            Ok(body) => Section::from_body(&body),
            Err(e) => {
                tracing::warn!(error = %e, sector, "School list unavailable");
                Section::Unavailable
            }
        }
    }

    // =========================================================================
    // Address search
    // =========================================================================

    /// Search addresses. Falls back to a fixed sample list when the backend
    /// fails and the fallback is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails and the fallback is disabled.
    #[instrument(skip(self))]
    pub async fn address_search(&self, query: &str) -> Result<Vec<AddressSuggestion>, BackendError> {
        match self.search_upstream(query).await {
            Ok(results) => Ok(results),
            Err(e) if self.inner.address_sample_fallback => {
                tracing::warn!(error = %e, "Address search failed, serving sample addresses");
                Ok(sample_addresses(query))
            }
            Err(e) => Err(e),
        }
    }

    async fn search_upstream(&self, query: &str) -> Result<Vec<AddressSuggestion>, BackendError> {
        let mut url = self.url(&["address_search"])?;
        url.query_pairs_mut().append_pair("q", query);

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status));
        }

        let results: AddressResponse = response.json().await?;
        Ok(results.into_suggestions())
    }
}

/// Sample addresses matching `query` (case-insensitive), or all of them when
/// nothing matches.
fn sample_addresses(query: &str) -> Vec<AddressSuggestion> {
    let needle = query.trim().to_lowercase();
    let all = SAMPLE_ADDRESSES.iter().map(|(label, suburb, state, postcode)| AddressSuggestion {
        label: (*label).to_string(),
        suburb: Some((*suburb).to_string()),
        state: Some((*state).to_string()),
        postcode: Some((*postcode).to_string()),
        latitude: None,
        longitude: None,
    });

    let matching: Vec<_> = all
        .clone()
        .filter(|a| a.label.to_lowercase().contains(&needle))
        .collect();

    if matching.is_empty() { all.collect() } else { matching }
}
