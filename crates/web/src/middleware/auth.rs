//! Session extractors for route handlers.
//!
//! Both extractors read the `mib_session` cookie and go through the
//! [`SessionManager`](crate::session::SessionManager), so stale cookies are
//! cleared and `last_accessed` is refreshed exactly as for explicit calls.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::AppError;
use crate::session::SessionRecord;
use crate::state::AppState;

/// Extractor that requires a valid session.
///
/// Rejects with 401 `{success: false, error: "Not authenticated"}`, clearing
/// the cookie when it referenced a stale session.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireSession(session): RequireSession,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", session.user.display_name())
/// }
/// ```
pub struct RequireSession(pub SessionRecord);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        match state.sessions().get_session(jar).await {
            Ok((_, Some(session))) => Ok(Self(session)),
            Ok((jar, None)) => Err((jar, AppError::NotAuthenticated).into_response()),
            Err(e) => Err(AppError::from(e).into_response()),
        }
    }
}

/// Extractor that loads the session if there is one.
///
/// Never rejects: a store failure is logged and treated as anonymous. Return
/// `jar` from the handler so a stale cookie gets cleared.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalSession { jar, session }: OptionalSession) -> impl IntoResponse {
///     let name = session.map_or_else(|| "guest".to_string(), |s| s.user.display_name());
///     (jar, format!("Hello, {name}!"))
/// }
/// ```
pub struct OptionalSession {
    pub jar: CookieJar,
    pub session: Option<SessionRecord>,
}

impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        match state.sessions().get_session(jar.clone()).await {
            Ok((jar, session)) => Ok(Self { jar, session }),
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, treating request as anonymous");
                Ok(Self { jar, session: None })
            }
        }
    }
}
