//! Wire types for the identity vendor's admin REST API.

use std::collections::HashMap;

use mib_core::identity::{Member, PlanConnection, PlanConnectionStatus};
use serde::Deserialize;

/// Envelope around every admin API payload.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// Member as returned by `GET /members/{id-or-email}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMember {
    pub id: String,
    #[serde(default)]
    pub auth: RawAuth,
    #[serde(default)]
    pub custom_fields: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub plan_connections: Vec<RawPlanConnection>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawAuth {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPlanConnection {
    pub plan_id: String,
    pub status: PlanConnectionStatus,
}

impl RawMember {
    fn custom_field(&self, key: &str) -> Option<String> {
        self.custom_fields
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }
}

impl From<RawMember> for Member {
    fn from(raw: RawMember) -> Self {
        let first_name = raw.custom_field("first-name");
        let last_name = raw.custom_field("last-name");

        Self {
            id: raw.id,
            email: raw.auth.email,
            first_name,
            last_name,
            plan_connections: raw
                .plan_connections
                .into_iter()
                .map(|c| PlanConnection {
                    plan_id: c.plan_id,
                    status: c.status,
                })
                .collect(),
        }
    }
}
