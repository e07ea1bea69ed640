//! Session route handlers.
//!
//! The browser authenticates with the identity vendor's SDK first, then
//! posts the outcome here. These handlers look the member up with the admin
//! API, copy the identity into a server-side session and set the cookie.

use axum::{Json, extract::State};
use axum_extra::extract::{WithRejection, cookie::CookieJar};
use mib_core::identity::{
    ClientIdentity, LoginRequest, Member, SessionUser, SignupRequest, TEMP_ID_PREFIX, VendorEnv,
};
use mib_core::Email;
use mib_core::plans::{catalog, resolve_best_plan};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalSession, RequireSession};
use crate::state::AppState;

// =============================================================================
// Response Types
// =============================================================================

/// Body of a successful login or session lookup.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub user: SessionUser,
}

/// Body of a successful signup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub user: SessionUser,
    /// The chosen plan is paid, so the browser continues to checkout.
    pub requires_checkout: bool,
    /// Where checkout sends the browser back to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_return_url: Option<String>,
}

/// Body of `POST /logout`.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Body of `GET /check`.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub logged_in: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a session after a successful client-side login.
///
/// The member is looked up by id, then by email. When both lookups fail and
/// the browser sent a member id, a provisional user is built from the
/// client's fields; without an id the login is refused.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    require_fields(&req.email, &req.memberstack_token)?;

    let identity = req.client_identity();
    let env = req.env.unwrap_or_else(|| state.memberstack().default_env());

    let user = match find_member(&state, &identity, env).await {
        Some(member) => SessionUser::from_member(&member, &identity),
        None => {
            let Some(id) = identity.member_id.clone() else {
                return Err(AppError::NotFound("Member not found".to_string()));
            };
            tracing::warn!(
                member_id = %id,
                "Vendor lookup failed, creating provisional session from client fields"
            );
            SessionUser::provisional(id, &identity)
        }
    };

    let (jar, _) = state.sessions().create_session(jar, user.clone()).await?;
    set_sentry_user(&user.id, Some(&user.email));

    Ok((jar, Json(SessionResponse { success: true, user })))
}

/// Create a session after a successful client-side signup.
///
/// Never answers 404: a brand-new member may not be visible to the admin API
/// yet, so the client's id (or a generated `temp_` id) is used instead.
#[tracing::instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<SignupRequest>, AppError>,
) -> Result<(CookieJar, Json<SignupResponse>)> {
    require_fields(&req.email, &req.memberstack_token)?;

    let identity = req.client_identity();
    let env = req.env.unwrap_or_else(|| state.memberstack().default_env());

    let user = match find_member(&state, &identity, env).await {
        Some(member) => SessionUser::from_member(&member, &identity),
        None => {
            let id = identity
                .member_id
                .clone()
                .unwrap_or_else(|| format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4()));
            tracing::warn!(member_id = %id, "New member not visible to the admin API yet");
            SessionUser::provisional(id, &identity)
        }
    };

    let requires_checkout = plan_requires_checkout(&req.plan);
    let checkout_return_url = requires_checkout.then(|| state.config().checkout_return_url());

    let (jar, _) = state.sessions().create_session(jar, user.clone()).await?;
    set_sentry_user(&user.id, Some(&user.email));

    Ok((
        jar,
        Json(SignupResponse {
            success: true,
            user,
            requires_checkout,
            checkout_return_url,
        }),
    ))
}

/// Return the current session's user.
pub async fn session(RequireSession(session): RequireSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        success: true,
        user: session.user,
    })
}

/// Destroy the current session. Succeeds without a session too.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>)> {
    let jar = state.sessions().destroy_session(jar).await?;
    clear_sentry_user();
    Ok((jar, Json(LogoutResponse { success: true })))
}

/// Report whether the browser holds a valid session. Always 200.
pub async fn check(OptionalSession { jar, session }: OptionalSession) -> (CookieJar, Json<CheckResponse>) {
    (
        jar,
        Json(CheckResponse {
            logged_in: session.is_some(),
        }),
    )
}

// =============================================================================
// Helpers
// =============================================================================

fn require_fields(email: &str, token: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(AppError::BadRequest("Email is required".to_string()));
    }
    if token.trim().is_empty() {
        return Err(AppError::BadRequest("Memberstack token is required".to_string()));
    }
    Email::parse(email).map_err(|e| AppError::BadRequest(format!("Invalid email: {e}")))?;
    Ok(())
}

async fn find_member(state: &AppState, identity: &ClientIdentity, env: VendorEnv) -> Option<Member> {
    let client = state.memberstack();

    if let Some(id) = &identity.member_id
        && let Some(member) = client.get_member_by_id(id, env).await
    {
        return Some(member);
    }

    client.get_member_by_email(&identity.email, env).await
}

/// Whether the plan picked on the pricing page is a paid catalog plan. The
/// browser may send a canonical id or a vendor plan id.
fn plan_requires_checkout(plan: &str) -> bool {
    resolve_best_plan(&[plan])
        .and_then(|id| catalog::find(&id))
        .is_some_and(catalog::Plan::requires_checkout)
}
