//! Static subscription catalog.

use core::fmt;

use serde::{Serialize, Serializer};

use crate::types::Price;

/// Canonical id of the free tier.
pub const FREE: &str = "free";
/// Canonical id of the entry paid tier.
pub const ESSENTIALS: &str = "essentials";
/// Canonical id of the mid-high tier.
pub const ADVANCED: &str = "advanced";
/// Canonical id of the top tier.
pub const PORTFOLIO_BUILDER: &str = "portfolio-builder";

/// Resources that count against a monthly quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    SuburbReport,
    PropertyReport,
}

/// Monthly allowance for one resource kind.
///
/// Serializes as a plain number, with `-1` standing for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    /// Wire value for [`Quota::Unlimited`].
    pub const UNLIMITED_RAW: i64 = -1;

    /// Build a quota from its raw representation. Any negative value is
    /// unlimited.
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        u32::try_from(raw).map_or(Self::Unlimited, Self::Limited)
    }

    /// Raw representation, `-1` for unlimited.
    #[must_use]
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Limited(n) => i64::from(n),
            Self::Unlimited => Self::UNLIMITED_RAW,
        }
    }

    /// What is left after `used` units were consumed. Never negative;
    /// unlimited stays unlimited regardless of usage.
    #[must_use]
    pub const fn remaining(self, used: u32) -> Self {
        match self {
            Self::Limited(limit) => Self::Limited(limit.saturating_sub(used)),
            Self::Unlimited => Self::Unlimited,
        }
    }

    #[must_use]
    pub const fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl Serialize for Quota {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_raw())
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    /// Ordinal access level. Higher means more access.
    pub tier: u8,
    pub suburb_reports: Quota,
    pub property_reports: Quota,
    /// Human-readable feature bullets for the pricing page.
    pub features: &'static [&'static str],
    /// `None` for plans that never go through checkout.
    pub price: Option<Price>,
}

impl Plan {
    /// Monthly quota for a resource kind.
    #[must_use]
    pub const fn quota(&self, kind: ResourceKind) -> Quota {
        match kind {
            ResourceKind::SuburbReport => self.suburb_reports,
            ResourceKind::PropertyReport => self.property_reports,
        }
    }

    /// Whether choosing this plan at signup requires a checkout redirect.
    #[must_use]
    pub fn requires_checkout(&self) -> bool {
        self.price.is_some_and(|p| !p.is_zero())
    }
}

const FREE_PLAN: Plan = Plan {
    id: FREE,
    name: "Free",
    tier: 0,
    suburb_reports: Quota::Limited(0),
    property_reports: Quota::Limited(0),
    features: &[
        "Suburb and property search",
        "Report previews",
        "Market snapshot for every suburb",
    ],
    price: None,
};

/// All plans, ordered by tier.
pub static PLANS: [Plan; 4] = [
    FREE_PLAN,
    Plan {
        id: ESSENTIALS,
        name: "Essentials",
        tier: 1,
        suburb_reports: Quota::Limited(5),
        property_reports: Quota::Limited(10),
        features: &[
            "5 suburb reports per month",
            "10 property reports per month",
            "Full report access without blur",
            "Email support",
        ],
        price: Some(Price::aud_cents(2900)),
    },
    Plan {
        id: ADVANCED,
        name: "Advanced",
        tier: 2,
        suburb_reports: Quota::Limited(20),
        property_reports: Quota::Limited(30),
        features: &[
            "20 suburb reports per month",
            "30 property reports per month",
            "CSV data export",
            "Unlimited suburb finder",
            "Email support",
        ],
        price: Some(Price::aud_cents(7900)),
    },
    Plan {
        id: PORTFOLIO_BUILDER,
        name: "Portfolio Builder",
        tier: 3,
        suburb_reports: Quota::Unlimited,
        property_reports: Quota::Unlimited,
        features: &[
            "Unlimited suburb reports",
            "Unlimited property reports",
            "CSV data export",
            "Unlimited suburb finder",
            "Priority support",
        ],
        price: Some(Price::aud_cents(19900)),
    },
];

/// Look up a catalog entry by canonical id.
#[must_use]
pub fn find(id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|plan| plan.id == id)
}

/// The free-tier entry.
#[must_use]
pub const fn free() -> &'static Plan {
    &FREE_PLAN
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_unique() {
        for (i, a) in PLANS.iter().enumerate() {
            for b in PLANS.iter().skip(i + 1) {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_catalog_tiers_strictly_ordered() {
        assert!(PLANS.windows(2).all(|w| w[0].tier < w[1].tier));
    }

    #[test]
    fn test_find() {
        assert_eq!(find(ADVANCED).unwrap().name, "Advanced");
        assert_eq!(find(FREE).unwrap().tier, 0);
        assert!(find("pln_advanced-ni690fz3").is_none());
        assert_eq!(free().id, FREE);
    }

    #[test]
    fn test_free_plan_is_catalog_entry() {
        assert_eq!(find(FREE), Some(free()));
        assert_eq!(PLANS.first(), Some(free()));
        assert_eq!(free().quota(ResourceKind::PropertyReport), Quota::Limited(0));
    }

    #[test]
    fn test_quota_remaining_floors_at_zero() {
        assert_eq!(Quota::Limited(5).remaining(7), Quota::Limited(0));
        assert_eq!(Quota::Limited(30).remaining(1), Quota::Limited(29));
        assert_eq!(Quota::Unlimited.remaining(10_000), Quota::Unlimited);
    }

    #[test]
    fn test_quota_raw() {
        assert_eq!(Quota::from_raw(-1), Quota::Unlimited);
        assert_eq!(Quota::from_raw(20), Quota::Limited(20));
        assert_eq!(Quota::Unlimited.as_raw(), -1);
        assert_eq!(serde_json::to_string(&Quota::Unlimited).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Quota::Limited(5)).unwrap(), "5");
    }

    #[test]
    fn test_requires_checkout() {
        assert!(!find(FREE).unwrap().requires_checkout());
        assert!(find(ESSENTIALS).unwrap().requires_checkout());
    }

    #[test]
    fn test_plan_serializes_camel_case() {
        let json = serde_json::to_value(find(PORTFOLIO_BUILDER).unwrap()).unwrap();
        assert_eq!(json["suburbReports"], -1);
        assert_eq!(json["propertyReports"], -1);
        assert_eq!(json["tier"], 3);
    }
}
