//! Entitlement service.
//!
//! Combines the session user's resolved plan with this month's order count
//! from the backend. Computed on every request, never cached.

use chrono::{DateTime, Utc};
use mib_core::entitlement::{Entitlement, Usage, count_usage};
use mib_core::identity::SessionUser;
use mib_core::plans::ResolvedPlan;

use crate::backend::BackendClient;

/// Entitlement service.
pub struct EntitlementService<'a> {
    backend: &'a BackendClient,
}

impl<'a> EntitlementService<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    /// Snapshot of what `user` may do in the month containing `now`.
    ///
    /// An order history that cannot be fetched counts as no usage.
    pub async fn snapshot(&self, user: &SessionUser, now: DateTime<Utc>) -> Entitlement {
        let plan = ResolvedPlan::from_plan_ids(&user.plan_ids);

        let usage = match self.backend.fetch_orders(&user.email).await {
            Ok(orders) => count_usage(&orders, now),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    user_id = %user.id,
                    "Order history unavailable, reporting zero usage"
                );
                Usage::default()
            }
        };

        tracing::debug!(
            plan = plan.id(),
            property_reports = usage.property_reports,
            suburb_reports = usage.suburb_reports,
            "Entitlement computed"
        );

        Entitlement::compute(&plan, usage)
    }
}
