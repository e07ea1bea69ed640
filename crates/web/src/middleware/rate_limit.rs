//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: strict limits for login, signup and logout (~10/min)
//! - `proxy_rate_limiter`: relaxed limits for the backend proxy (~100/min)
//! - `rate_limit_error_middleware`: turns limiter rejections into the JSON
//!   error body

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::{
    extract::Request as AxumRequest,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Headers carrying the real client IP, in order of trust. For
/// `x-forwarded-for` the first address of the chain is used.
const CLIENT_IP_HEADERS: &[&str] = &[
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Key extractor that reads the client IP from proxy headers.
///
/// Requests without any proxy header did not come through the edge; they
/// share one bucket keyed on the unspecified address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl ClientIpKeyExtractor {
    fn client_ip(headers: &axum::http::HeaderMap) -> Option<IpAddr> {
        CLIENT_IP_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(Self::client_ip(req.headers()).unwrap_or_else(|| {
            tracing::debug!("No client IP header, using shared rate limit bucket");
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }))
    }
}

// =============================================================================
// Rejection Body
// =============================================================================

/// Headers from the limiter's rejection that survive the rewrite.
const RETRY_HEADERS: &[&str] = &["retry-after", "x-ratelimit-after"];

/// Rewrite the limiter's plain-text rejections into `{success, error, code}`.
pub async fn rate_limit_error_middleware(request: AxumRequest, next: Next) -> Response {
    let response = next.run(request).await;

    let error = match response.status() {
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited,
        status if status.is_server_error() && !is_json(&response) => {
            AppError::Internal(format!("rate limiter rejected request with {status}"))
        }
        _ => return response,
    };

    let mut rewritten = error.into_response();
    for name in RETRY_HEADERS {
        if let Some(value) = response.headers().get(*name) {
            rewritten.headers_mut().insert(*name, value.clone());
        }
    }
    rewritten
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for login, signup and logout: ~10 requests per minute per IP.
///
/// Replenishes one request every 6 seconds with a burst of 5.
///
/// # Panics
///
/// Does not panic: `per_second(6)` and `burst_size(5)` are both non-zero,
/// which is all `GovernorConfigBuilder::finish` checks.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Rate limiter for the report, school and address proxy: ~100 requests per
/// minute per IP with a burst of 50, enough for a report page fanning out
/// its sections.
///
/// # Panics
///
/// Does not panic: `per_second(1)` and `burst_size(50)` are both non-zero.
#[must_use]
pub fn proxy_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}
