//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. Security headers
//! 5. Rate limiting (governor), on session writes and the proxy routes only
//!
//! Sessions are not a layer: handlers pull them through the
//! [`RequireSession`] and [`OptionalSession`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{OptionalSession, RequireSession};
pub use rate_limit::{auth_rate_limiter, proxy_rate_limiter, rate_limit_error_middleware};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
