//! Live integration tests for the MiB web server.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the server against staging credentials
//! MIB_ENV=development cargo run -p mib-web
//!
//! # Run the ignored live tests
//! MIB_TEST_URL=http://localhost:3000 cargo test -p mib-integration-tests -- --ignored
//! ```
//!
//! Tests that log a real member in also need `MIB_TEST_MEMBER_ID` and
//! `MIB_TEST_MEMBER_EMAIL` for a member that exists in the vendor's
//! environment the server is configured with.

use reqwest::Client;
use serde_json::Value;

/// Base URL of the running server.
#[must_use]
pub fn base_url() -> String {
    std::env::var("MIB_TEST_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// A known member for login tests, if configured.
#[must_use]
pub fn test_member() -> Option<(String, String)> {
    let id = std::env::var("MIB_TEST_MEMBER_ID").ok()?;
    let email = std::env::var("MIB_TEST_MEMBER_EMAIL").ok()?;
    Some((id, email))
}

/// HTTP client that keeps the session cookie between requests.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized.
#[must_use]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// GET a path and decode the JSON body.
///
/// # Errors
///
/// Returns the transport error if the request fails or the body is not JSON.
pub async fn get_json(client: &Client, path: &str) -> reqwest::Result<(u16, Value)> {
    let resp = client.get(format!("{}{path}", base_url())).send().await?;
    let status = resp.status().as_u16();
    Ok((status, resp.json().await?))
}

/// POST a JSON body and decode the JSON response.
///
/// # Errors
///
/// Returns the transport error if the request fails or the body is not JSON.
pub async fn post_json(client: &Client, path: &str, body: &Value) -> reqwest::Result<(u16, Value)> {
    let resp = client
        .post(format!("{}{path}", base_url()))
        .json(body)
        .send()
        .await?;
    let status = resp.status().as_u16();
    Ok((status, resp.json().await?))
}
