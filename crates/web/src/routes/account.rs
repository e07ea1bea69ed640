//! Subscription and plan catalog handlers.

use axum::{Json, extract::State};
use chrono::Utc;
use mib_core::entitlement::Entitlement;
use mib_core::plans::{PLANS, Plan};
use serde::Serialize;

use crate::middleware::RequireSession;
use crate::services::EntitlementService;
use crate::state::AppState;

/// Body of `GET /api/subscription`.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub success: bool,
    pub subscription: Entitlement,
}

/// Body of `GET /api/plans`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlansResponse {
    pub success: bool,
    pub plans: &'static [Plan],
    /// Public app id the pricing page initializes the vendor SDK with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memberstack_app_id: Option<String>,
}

/// Current plan, this month's usage and unlocked features.
pub async fn subscription(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Json<SubscriptionResponse> {
    let subscription = EntitlementService::new(state.backend())
        .snapshot(&session.user, Utc::now())
        .await;

    Json(SubscriptionResponse {
        success: true,
        subscription,
    })
}

/// The static plan catalog for the pricing page.
pub async fn plans(State(state): State<AppState>) -> Json<PlansResponse> {
    Json(PlansResponse {
        success: true,
        plans: &PLANS,
        memberstack_app_id: state.config().memberstack.app_id.clone(),
    })
}
