//! Identity-vendor member records, the user copy held in a session, and the
//! request bodies the browser sends after authenticating with the vendor.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::plans::resolve_best_plan;

/// Which vendor environment (and therefore which admin API key) a call uses.
///
/// Always passed explicitly, never inferred from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VendorEnv {
    Staging,
    #[default]
    Production,
}

impl VendorEnv {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for VendorEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized [`VendorEnv`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown vendor environment: {0}")]
pub struct UnknownVendorEnv(String);

impl FromStr for VendorEnv {
    type Err = UnknownVendorEnv;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staging" | "sandbox" | "test" => Ok(Self::Staging),
            "production" | "prod" | "live" => Ok(Self::Production),
            other => Err(UnknownVendorEnv(other.to_owned())),
        }
    }
}

/// Status of a plan connection as reported by the vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanConnectionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    #[serde(other)]
    Other,
}

/// Link between a member and a subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanConnection {
    pub plan_id: String,
    pub status: PlanConnectionStatus,
}

/// A member as returned by the vendor's admin API, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub plan_connections: Vec<PlanConnection>,
}

/// Plan ids of the member's `ACTIVE` plan connections.
#[must_use]
pub fn active_plan_ids(member: &Member) -> Vec<String> {
    member
        .plan_connections
        .iter()
        .filter(|conn| conn.status == PlanConnectionStatus::Active)
        .map(|conn| conn.plan_id.clone())
        .collect()
}

/// Identity copied into a session.
///
/// A denormalized snapshot: it is never re-read from the vendor while the
/// session lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// Vendor member id, or a locally generated `temp_` id.
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub memberstack_id: Option<String>,
    #[serde(default)]
    pub plan_ids: Vec<String>,
    pub best_plan: Option<String>,
    /// Built from client-supplied fields because the vendor lookup failed.
    #[serde(default)]
    pub provisional: bool,
}

impl SessionUser {
    /// Build a user from a vendor member. Name fields fall back to the ones
    /// the client sent when the vendor has none.
    #[must_use]
    pub fn from_member(member: &Member, fallback: &ClientIdentity) -> Self {
        let plan_ids = active_plan_ids(member);
        let best_plan = resolve_best_plan(&plan_ids);
        Self {
            id: member.id.clone(),
            email: member.email.clone(),
            first_name: non_empty(member.first_name.as_deref())
                .or_else(|| non_empty(fallback.first_name.as_deref()))
                .unwrap_or_default(),
            last_name: non_empty(member.last_name.as_deref())
                .or_else(|| non_empty(fallback.last_name.as_deref()))
                .unwrap_or_default(),
            memberstack_id: Some(member.id.clone()),
            plan_ids,
            best_plan,
            provisional: false,
        }
    }

    /// Build a user purely from client-supplied fields. No plans are
    /// trusted from the client, so the user starts on the free tier.
    #[must_use]
    pub fn provisional(id: String, fallback: &ClientIdentity) -> Self {
        let memberstack_id = (!id.starts_with(TEMP_ID_PREFIX)).then(|| id.clone());
        Self {
            id,
            email: fallback.email.clone(),
            first_name: fallback.first_name.clone().unwrap_or_default(),
            last_name: fallback.last_name.clone().unwrap_or_default(),
            memberstack_id,
            plan_ids: Vec::new(),
            best_plan: None,
            provisional: true,
        }
    }

    /// Display name, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_owned()
        }
    }
}

/// Prefix of locally generated user ids.
pub const TEMP_ID_PREFIX: &str = "temp_";

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Identity fields the browser already holds after authenticating with the
/// vendor SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    pub email: String,
    pub member_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub memberstack_token: String,
    pub memberstack_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub env: Option<VendorEnv>,
}

impl LoginRequest {
    #[must_use]
    pub fn client_identity(&self) -> ClientIdentity {
        ClientIdentity {
            email: self.email.trim().to_owned(),
            member_id: self.memberstack_id.clone().filter(|id| !id.trim().is_empty()),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Body of `POST /api/auth/signup`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Canonical id of the plan chosen on the pricing page.
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub memberstack_token: String,
    pub memberstack_id: Option<String>,
    pub env: Option<VendorEnv>,
}

impl SignupRequest {
    #[must_use]
    pub fn client_identity(&self) -> ClientIdentity {
        ClientIdentity {
            email: self.email.trim().to_owned(),
            member_id: self.memberstack_id.clone().filter(|id| !id.trim().is_empty()),
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
        }
    }
}
