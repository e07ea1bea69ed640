//! Login and signup flow as an explicit state machine.
//!
//! ```text
//! Anonymous ──Submit──▶ ClientAuthenticating ──ClientSucceeded──▶ ServerSessionPending
//!     ▲                        │                                        │
//!     └──── ClientFailed ──────┘        SessionFailed ◀─────────────────┤
//!                                                                       ▼
//!                                        Authenticated ◀── SessionCreated
//! ```
//!
//! Every failure returns to `Anonymous` carrying the error to show. Retries
//! are unlimited; there is no lockout state.

use serde::Serialize;

use crate::identity::{LoginRequest, SessionUser, SignupRequest, VendorEnv};
use crate::vendor::{AuthFailure, SdkMember};

/// How the user authenticates with the vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    EmailPassword,
    Google,
}

/// What the user is trying to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Login,
    Signup {
        /// Canonical plan id chosen on the pricing page.
        plan: String,
        first_name: String,
        last_name: String,
    },
}

/// Post-signup checkout progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkout {
    NotRequired,
    /// Redirected to the vendor's checkout; session already exists.
    Pending,
    /// Back from checkout. The UI shows the detail-completion prompt.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous {
        error: Option<AuthFailure>,
    },
    ClientAuthenticating {
        intent: Intent,
        method: AuthMethod,
    },
    ServerSessionPending {
        intent: Intent,
        member: SdkMember,
    },
    Authenticated {
        user: SessionUser,
        checkout: Checkout,
    },
}

impl Default for AuthState {
    fn default() -> Self {
        Self::Anonymous { error: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The user submitted a form or clicked an OAuth button.
    Submit { intent: Intent, method: AuthMethod },
    /// The vendor SDK authenticated the user.
    ClientSucceeded(SdkMember),
    ClientFailed(AuthFailure),
    /// The local login/signup route created a session.
    SessionCreated {
        user: SessionUser,
        requires_checkout: bool,
    },
    SessionFailed(AuthFailure),
    /// The browser came back from the vendor checkout.
    CheckoutReturned,
    LoggedOut,
}

impl AuthEvent {
    const fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::ClientSucceeded(_) => "client_succeeded",
            Self::ClientFailed(_) => "client_failed",
            Self::SessionCreated { .. } => "session_created",
            Self::SessionFailed(_) => "session_failed",
            Self::CheckoutReturned => "checkout_returned",
            Self::LoggedOut => "logged_out",
        }
    }
}

/// An event that has no transition from the current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event `{event}` is not valid in state `{state}`")]
pub struct InvalidTransition {
    pub state: &'static str,
    pub event: &'static str,
}

/// Body for the local route call made in [`AuthState::ServerSessionPending`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SessionRequest {
    Login(LoginRequest),
    Signup(SignupRequest),
}

impl AuthState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Anonymous { .. } => "anonymous",
            Self::ClientAuthenticating { .. } => "client_authenticating",
            Self::ServerSessionPending { .. } => "server_session_pending",
            Self::Authenticated { .. } => "authenticated",
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Whether a request is in flight and the form should be disabled.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::ClientAuthenticating { .. } | Self::ServerSessionPending { .. }
        )
    }

    /// Advance the flow.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if `event` cannot happen in this state.
    /// The state is handed back unchanged alongside the error.
    #[allow(clippy::result_large_err)]
    pub fn apply(self, event: AuthEvent) -> Result<Self, (Self, InvalidTransition)> {
        match (self, event) {
            (Self::Anonymous { .. }, AuthEvent::Submit { intent, method }) => {
                Ok(Self::ClientAuthenticating { intent, method })
            }
            (Self::ClientAuthenticating { intent, .. }, AuthEvent::ClientSucceeded(member)) => {
                Ok(Self::ServerSessionPending { intent, member })
            }
            (
                Self::ClientAuthenticating { .. } | Self::ServerSessionPending { .. },
                AuthEvent::ClientFailed(error) | AuthEvent::SessionFailed(error),
            ) => Ok(Self::Anonymous { error: Some(error) }),
            (
                Self::ServerSessionPending { .. },
                AuthEvent::SessionCreated {
                    user,
                    requires_checkout,
                },
            ) => Ok(Self::Authenticated {
                user,
                checkout: if requires_checkout {
                    Checkout::Pending
                } else {
                    Checkout::NotRequired
                },
            }),
            (
                Self::Authenticated {
                    user,
                    checkout: Checkout::Pending,
                },
                AuthEvent::CheckoutReturned,
            ) => Ok(Self::Authenticated {
                user,
                checkout: Checkout::Completed,
            }),
            (Self::Authenticated { .. }, AuthEvent::LoggedOut) => Ok(Self::default()),
            (state, event) => {
                let err = InvalidTransition {
                    state: state.name(),
                    event: event.name(),
                };
                Err((state, err))
            }
        }
    }

    /// The local route body to send once the vendor SDK has authenticated
    /// the user. Only available in [`AuthState::ServerSessionPending`].
    #[must_use]
    pub fn session_request(&self, env: Option<VendorEnv>) -> Option<SessionRequest> {
        let Self::ServerSessionPending { intent, member } = self else {
            return None;
        };

        Some(match intent {
            Intent::Login => SessionRequest::Login(LoginRequest {
                email: member.email.clone(),
                memberstack_token: member.token.clone(),
                memberstack_id: Some(member.member_id.clone()),
                first_name: member.first_name.clone(),
                last_name: member.last_name.clone(),
                env,
            }),
            Intent::Signup {
                plan,
                first_name,
                last_name,
            } => SessionRequest::Signup(SignupRequest {
                email: member.email.clone(),
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                plan: plan.clone(),
                memberstack_token: member.token.clone(),
                memberstack_id: Some(member.member_id.clone()),
                env,
            }),
        })
    }

    /// Whether the UI should show the post-checkout detail prompt.
    #[must_use]
    pub const fn show_detail_prompt(&self) -> bool {
        matches!(
            self,
            Self::Authenticated {
                checkout: Checkout::Completed,
                ..
            }
        )
    }
}
