//! What a user can do this month: quota arithmetic and tier features.
//!
//! Snapshots are derived on every request from the resolved plan and the
//! user's order history. Nothing here is stored.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::plans::{Quota, ResolvedPlan, ResourceKind};

/// Tier that unlocks CSV export and the unlimited suburb finder.
pub const CSV_EXPORT_MIN_TIER: u8 = 2;
/// Tier that unlocks priority support.
pub const PRIORITY_SUPPORT_MIN_TIER: u8 = 3;

/// Accepted order date layouts (day-month-year).
const ORDER_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y"];

/// An order as the upstream backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(default, alias = "type", alias = "reportType", alias = "category")]
    pub report_type: String,
    #[serde(default, alias = "order_date", alias = "orderDate")]
    pub date: String,
}

impl OrderRecord {
    /// The quota this order counts against, if any.
    #[must_use]
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        let category = self.report_type.trim();
        if category.eq_ignore_ascii_case("property") {
            Some(ResourceKind::PropertyReport)
        } else if category.eq_ignore_ascii_case("suburb") {
            Some(ResourceKind::SuburbReport)
        } else {
            None
        }
    }
}

/// Parse a `dd/mm/yyyy` or `dd-mm-yyyy` date, ignoring anything after the
/// first whitespace (a time of day).
#[must_use]
pub fn parse_order_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split_whitespace().next()?;
    ORDER_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Orders placed in the current calendar month, per resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub suburb_reports: u32,
    pub property_reports: u32,
}

impl Usage {
    #[must_use]
    pub const fn used(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::SuburbReport => self.suburb_reports,
            ResourceKind::PropertyReport => self.property_reports,
        }
    }
}

/// Count orders whose date falls in the same month and year as `now`.
///
/// Orders with an unknown category or an unparsable date are skipped.
#[must_use]
pub fn count_usage(orders: &[OrderRecord], now: DateTime<Utc>) -> Usage {
    let today = now.date_naive();
    orders
        .iter()
        .filter_map(|order| {
            let kind = order.resource_kind()?;
            let date = parse_order_date(&order.date)?;
            (date.year() == today.year() && date.month() == today.month()).then_some(kind)
        })
        .fold(Usage::default(), |mut usage, kind| {
            match kind {
                ResourceKind::SuburbReport => usage.suburb_reports += 1,
                ResourceKind::PropertyReport => usage.property_reports += 1,
            }
            usage
        })
}

/// Boolean features derived from tier thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub csv_export: bool,
    pub unlimited_finder: bool,
    pub priority_support: bool,
}

impl Features {
    #[must_use]
    pub const fn for_tier(tier: u8) -> Self {
        Self {
            csv_export: tier >= CSV_EXPORT_MIN_TIER,
            unlimited_finder: tier >= CSV_EXPORT_MIN_TIER,
            priority_support: tier >= PRIORITY_SUPPORT_MIN_TIER,
        }
    }
}

/// Plan summary as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub id: String,
    pub name: String,
    pub tier: u8,
}

/// Used, remaining and limit per resource kind. Quotas serialize as `-1`
/// when unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub property_reports_used: u32,
    pub property_reports_left: Quota,
    pub property_reports_limit: Quota,
    pub suburb_reports_used: u32,
    pub suburb_reports_left: Quota,
    pub suburb_reports_limit: Quota,
}

/// The `subscription` object returned to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entitlement {
    pub plan: PlanSummary,
    pub usage: UsageSummary,
    pub features: Features,
}

impl Entitlement {
    /// Combine a resolved plan with this month's usage.
    #[must_use]
    pub fn compute(plan: &ResolvedPlan, usage: Usage) -> Self {
        let property_limit = plan.quota(ResourceKind::PropertyReport);
        let suburb_limit = plan.quota(ResourceKind::SuburbReport);

        Self {
            plan: PlanSummary {
                id: plan.id().to_owned(),
                name: plan.name().to_owned(),
                tier: plan.tier(),
            },
            usage: UsageSummary {
                property_reports_used: usage.property_reports,
                property_reports_left: property_limit.remaining(usage.property_reports),
                property_reports_limit: property_limit,
                suburb_reports_used: usage.suburb_reports,
                suburb_reports_left: suburb_limit.remaining(usage.suburb_reports),
                suburb_reports_limit: suburb_limit,
            },
            features: Features::for_tier(plan.tier()),
        }
    }
}
