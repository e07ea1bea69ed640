//! Client-side identity bridge.
//!
//! Wraps the vendor's browser SDK behind [`MemberSdk`] and translates every
//! outcome into a uniform [`ClientResult`]. The SDK reports errors as a bare
//! string, as an object with a `message`, or as an empty object; those
//! shapes are decoded once into [`SdkError`] and then into a typed
//! [`AuthFailure`], so nothing downstream inspects raw error values.

use std::future::Future;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorKind;

/// SDK operations the web client performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkOperation {
    Login,
    Signup,
    GoogleLogin,
    GoogleSignup,
    SendPasswordReset,
    ResetPassword,
    Checkout,
}

impl SdkOperation {
    const fn is_login(self) -> bool {
        matches!(self, Self::Login | Self::GoogleLogin)
    }

    const fn is_signup(self) -> bool {
        matches!(self, Self::Signup | Self::GoogleSignup)
    }
}

/// A request to the vendor SDK.
#[derive(Debug)]
pub enum SdkRequest {
    Login {
        email: String,
        password: SecretString,
    },
    Signup {
        email: String,
        password: SecretString,
        first_name: String,
        last_name: String,
        /// Vendor price/plan id for free plans added at signup.
        plan: Option<String>,
    },
    GoogleLogin,
    GoogleSignup {
        plan: Option<String>,
    },
    SendPasswordReset {
        email: String,
    },
    ResetPassword {
        token: String,
        password: SecretString,
    },
    Checkout {
        price_id: String,
    },
}

impl SdkRequest {
    #[must_use]
    pub const fn operation(&self) -> SdkOperation {
        match self {
            Self::Login { .. } => SdkOperation::Login,
            Self::Signup { .. } => SdkOperation::Signup,
            Self::GoogleLogin => SdkOperation::GoogleLogin,
            Self::GoogleSignup { .. } => SdkOperation::GoogleSignup,
            Self::SendPasswordReset { .. } => SdkOperation::SendPasswordReset,
            Self::ResetPassword { .. } => SdkOperation::ResetPassword,
            Self::Checkout { .. } => SdkOperation::Checkout,
        }
    }
}

/// Why an SDK call did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum SdkCallError {
    /// The SDK ran and rejected with this raw error value.
    Rejected(Value),
    /// The SDK script is not loaded.
    Unavailable,
}

/// The vendor's browser SDK.
pub trait MemberSdk: Send + Sync {
    /// Run one SDK operation. On success returns the SDK's `data` payload.
    fn call(&self, request: SdkRequest) -> impl Future<Output = Result<Value, SdkCallError>> + Send;
}

/// A raw SDK error after shape decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    Message(String),
    /// No usable detail: `{}`, `null`, or an empty string.
    Empty,
}

impl SdkError {
    /// Decode any of the shapes the SDK is known to reject with.
    #[must_use]
    pub fn decode(raw: &Value) -> Self {
        let message = match raw {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("message")
                .or_else(|| map.get("error"))
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(_) => match Self::decode(v) {
                        Self::Message(m) => Some(m),
                        Self::Empty => None,
                    },
                    _ => None,
                }),
            Value::Number(n) => Some(n.to_string()),
            Value::Null | Value::Bool(_) | Value::Array(_) => None,
        };

        message
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty())
            .map_or(Self::Empty, Self::Message)
    }
}

/// A failed identity operation, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl AuthFailure {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a decoded SDK error for the operation that produced it.
    #[must_use]
    pub fn from_sdk(operation: SdkOperation, error: SdkError) -> Self {
        match error {
            SdkError::Empty if operation.is_login() => {
                Self::new(ErrorKind::InvalidCredentials, "Invalid email or password.")
            }
            SdkError::Empty if operation.is_signup() => Self::new(
                ErrorKind::DuplicateAccount,
                "An account with this email may already exist. Try logging in instead.",
            ),
            SdkError::Empty => Self::new(
                ErrorKind::Vendor,
                "Something went wrong. Please try again.",
            ),
            SdkError::Message(message) => {
                let lower = message.to_lowercase();
                let kind = if operation.is_signup()
                    && ["already exists", "already in use", "already taken"]
                        .iter()
                        .any(|p| lower.contains(p))
                {
                    ErrorKind::DuplicateAccount
                } else if operation.is_login()
                    && ["invalid", "incorrect", "wrong password"]
                        .iter()
                        .any(|p| lower.contains(p))
                {
                    ErrorKind::InvalidCredentials
                } else {
                    ErrorKind::Vendor
                };
                Self::new(kind, message)
            }
        }
    }

    #[must_use]
    pub fn sdk_unavailable() -> Self {
        Self::new(
            ErrorKind::SdkUnavailable,
            "Authentication is still loading. Please try again in a moment.",
        )
    }

    fn unexpected_response() -> Self {
        Self::new(
            ErrorKind::Vendor,
            "Unexpected response from the identity provider.",
        )
    }
}

/// Uniform `{success, data?, error?, code?}` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorKind>,
}

impl<T> ClientResult<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    #[must_use]
    pub fn failed(failure: AuthFailure) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(failure.message),
            code: Some(failure.kind),
        }
    }

    /// Back to a `Result`, for callers that want `?`.
    ///
    /// # Errors
    ///
    /// Returns the failure when `success` is false or no data is present.
    pub fn into_result(self) -> Result<T, AuthFailure> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(AuthFailure::new(
                self.code.unwrap_or(ErrorKind::Vendor),
                self.error.unwrap_or_default(),
            )),
        }
    }
}

/// Member identity as the SDK hands it back after login or signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkMember {
    pub member_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub token: String,
}

#[derive(Deserialize)]
struct RawAuthData {
    member: RawMember,
    #[serde(default)]
    tokens: RawTokens,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMember {
    id: String,
    #[serde(default)]
    auth: RawAuth,
    #[serde(default)]
    custom_fields: serde_json::Map<String, Value>,
}

#[derive(Deserialize, Default)]
struct RawAuth {
    #[serde(default)]
    email: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawTokens {
    #[serde(default)]
    access_token: String,
}

impl SdkMember {
    /// Decode the `data` payload of a login or signup.
    #[must_use]
    pub fn decode(data: Value) -> Option<Self> {
        let raw: RawAuthData = serde_json::from_value(data).ok()?;
        let field = |key: &str| {
            raw.member
                .custom_fields
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_owned)
        };
        Some(Self {
            first_name: field("first-name"),
            last_name: field("last-name"),
            member_id: raw.member.id,
            email: raw.member.auth.email,
            token: raw.tokens.access_token,
        })
    }
}

/// Translates [`MemberSdk`] outcomes into [`ClientResult`]s.
pub struct ClientBridge<S> {
    sdk: S,
}

impl<S: MemberSdk> ClientBridge<S> {
    pub const fn new(sdk: S) -> Self {
        Self { sdk }
    }

    async fn run(&self, request: SdkRequest) -> Result<Value, AuthFailure> {
        let operation = request.operation();
        match self.sdk.call(request).await {
            Ok(data) => Ok(data),
            Err(SdkCallError::Unavailable) => Err(AuthFailure::sdk_unavailable()),
            Err(SdkCallError::Rejected(raw)) => {
                Err(AuthFailure::from_sdk(operation, SdkError::decode(&raw)))
            }
        }
    }

    async fn run_member(&self, request: SdkRequest) -> ClientResult<SdkMember> {
        match self.run(request).await {
            Ok(data) => SdkMember::decode(data).map_or_else(
                || ClientResult::failed(AuthFailure::unexpected_response()),
                ClientResult::ok,
            ),
            Err(failure) => ClientResult::failed(failure),
        }
    }

    async fn run_unit(&self, request: SdkRequest) -> ClientResult<()> {
        match self.run(request).await {
            Ok(_) => ClientResult::ok(()),
            Err(failure) => ClientResult::failed(failure),
        }
    }

    pub async fn login(&self, email: &str, password: SecretString) -> ClientResult<SdkMember> {
        self.run_member(SdkRequest::Login {
            email: email.trim().to_owned(),
            password,
        })
        .await
    }

    pub async fn signup(
        &self,
        email: &str,
        password: SecretString,
        first_name: &str,
        last_name: &str,
        plan: Option<&str>,
    ) -> ClientResult<SdkMember> {
        self.run_member(SdkRequest::Signup {
            email: email.trim().to_owned(),
            password,
            first_name: first_name.trim().to_owned(),
            last_name: last_name.trim().to_owned(),
            plan: plan.map(str::to_owned),
        })
        .await
    }

    pub async fn login_with_google(&self) -> ClientResult<SdkMember> {
        self.run_member(SdkRequest::GoogleLogin).await
    }

    pub async fn signup_with_google(&self, plan: Option<&str>) -> ClientResult<SdkMember> {
        self.run_member(SdkRequest::GoogleSignup {
            plan: plan.map(str::to_owned),
        })
        .await
    }

    pub async fn send_password_reset(&self, email: &str) -> ClientResult<()> {
        self.run_unit(SdkRequest::SendPasswordReset {
            email: email.trim().to_owned(),
        })
        .await
    }

    pub async fn reset_password(&self, token: &str, password: SecretString) -> ClientResult<()> {
        self.run_unit(SdkRequest::ResetPassword {
            token: token.to_owned(),
            password,
        })
        .await
    }

    /// Start the vendor checkout. The data is the redirect URL when the SDK
    /// returns one instead of navigating itself.
    pub async fn start_checkout(&self, price_id: &str) -> ClientResult<Option<String>> {
        match self
            .run(SdkRequest::Checkout {
                price_id: price_id.to_owned(),
            })
            .await
        {
            Ok(data) => ClientResult::ok(
                data.get("url")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            ),
            Err(failure) => ClientResult::failed(failure),
        }
    }
}
