//! MiB web library.
//!
//! Server-side sessions on top of a third-party identity vendor, plan and
//! usage entitlements, and a proxy to the analytics backend. Exposed as a
//! library so the router can be driven in tests without a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod memberstack;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

use axum::Router;

use state::AppState;

/// Build the application router with its request-scoped middleware.
///
/// Tracing and Sentry layers are added by the binary on top of this.
pub fn app(state: AppState, rate_limit: bool) -> Router {
    Router::new()
        .merge(routes::routes(rate_limit))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .with_state(state)
}
