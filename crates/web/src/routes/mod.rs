//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (pings the session store)
//!
//! # Sessions
//! POST /api/auth/login                      - Create session after client login
//! POST /api/auth/signup                     - Create session after client signup
//! GET  /api/auth/session                    - Current session user (401 without, not rate limited)
//! POST /api/auth/logout                     - Destroy session (idempotent)
//! GET  /api/auth/check                      - {logged_in}, always 200, not rate limited
//!
//! # Account
//! GET  /api/subscription                    - Plan, monthly usage, features (401 without session)
//! GET  /api/plans                           - Plan catalog
//!
//! # Backend proxy
//! GET  /api/reports/{kind}/{section}/{name} - One report section
//! GET  /api/reports/{kind}/{name}?sections= - Several sections concurrently
//! GET  /api/schools/{suburb}                - Private and public schools
//! GET  /api/address-search?q=               - Address autocomplete
//! ```

pub mod account;
pub mod auth;
pub mod health;
pub mod reports;

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, proxy_rate_limiter, rate_limit_error_middleware};
use crate::state::AppState;

/// Create the routes that create or destroy sessions.
pub fn session_write_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup))
        .route("/logout", post(auth::logout))
}

/// Create the session read routes. The browser polls these, so they stay
/// outside the auth rate limiter.
pub fn session_read_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(auth::session))
        .route("/check", get(auth::check))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/subscription", get(account::subscription))
        .route("/api/plans", get(account::plans))
}

/// Create the backend proxy routes router.
pub fn proxy_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports/{kind}/{section}/{name}", get(reports::section))
        .route("/api/reports/{kind}/{name}", get(reports::sections))
        .route("/api/schools/{suburb}", get(reports::schools))
        .route("/api/address-search", get(reports::address_search))
}

/// Create all routes.
///
/// With `rate_limit` set, session writes and the proxy routes are wrapped in
/// per-IP limiters keyed on proxy headers, which only exist behind the
/// production edge. Limiter rejections are rewritten into the JSON error body.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let (session_writes, proxy) = if rate_limit {
        (
            session_write_routes()
                .layer(auth_rate_limiter())
                .layer(from_fn(rate_limit_error_middleware)),
            proxy_routes()
                .layer(proxy_rate_limiter())
                .layer(from_fn(rate_limit_error_middleware)),
        )
    } else {
        (session_write_routes(), proxy_routes())
    };

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", session_writes.merge(session_read_routes()))
        .merge(account_routes())
        .merge(proxy)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };

    use crate::test_support::TestApp;

    fn request(method: &str, path: &str, client_ip: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(ip) = client_ip {
            builder = builder.header("x-forwarded-for", ip);
        }
        let body = if method == "POST" { Body::from("{}") } else { Body::empty() };
        builder.body(body).unwrap()
    }

    #[tokio::test]
    async fn test_session_reads_are_not_rate_limited() {
        let app = TestApp::start_rate_limited().await;

        for _ in 0..8 {
            let response = app
                .send(request("GET", "/api/auth/check", Some("203.0.113.7")))
                .await;
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.body["logged_in"], false);
        }

        for _ in 0..8 {
            let response = app
                .send(request("GET", "/api/auth/session", Some("203.0.113.7")))
                .await;
            assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        }

        let response = app.send(request("GET", "/api/auth/check", None)).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_rate_limit_answers_with_error_body() {
        let app = TestApp::start_rate_limited().await;

        for _ in 0..5 {
            let response = app
                .send(request("POST", "/api/auth/login", Some("203.0.113.8")))
                .await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST);
        }

        let response = app
            .send(request("POST", "/api/auth/login", Some("203.0.113.8")))
            .await;
        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["code"], "rate_limited");

        // Other clients keep their own bucket
        let response = app
            .send(request("POST", "/api/auth/login", Some("198.51.100.9")))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rate_limited_route_without_proxy_header_reaches_handler() {
        let app = TestApp::start_rate_limited().await;

        let response = app.send(request("POST", "/api/auth/login", None)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["code"], "bad_request");

        let response = app
            .send(request("GET", "/api/address-search?q=ab", None))
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }
}
