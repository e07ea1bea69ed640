//! Closed set of error kinds returned alongside every error message.
//!
//! Callers branch on the kind, never on the message text.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Wrong email/password, or the vendor gave no detail on a login.
    InvalidCredentials,
    /// An account already exists (or probably exists) for the email.
    DuplicateAccount,
    /// The vendor SDK is not loaded yet.
    SdkUnavailable,
    /// Any other failure reported by the identity vendor.
    Vendor,
    NotAuthenticated,
    NotFound,
    BadRequest,
    RateLimited,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::DuplicateAccount => "duplicate_account",
            Self::SdkUnavailable => "sdk_unavailable",
            Self::Vendor => "vendor",
            Self::NotAuthenticated => "not_authenticated",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::RateLimited => "rate_limited",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_matches_as_str() {
        for kind in [
            ErrorKind::InvalidCredentials,
            ErrorKind::DuplicateAccount,
            ErrorKind::SdkUnavailable,
            ErrorKind::Vendor,
            ErrorKind::NotAuthenticated,
            ErrorKind::NotFound,
            ErrorKind::BadRequest,
            ErrorKind::RateLimited,
            ErrorKind::Internal,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
