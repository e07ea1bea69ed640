//! Vendor plan strings to one canonical plan.
//!
//! The identity vendor assigns its own plan identifiers (for example
//! `pln_advanced-ni690fz3`). A member can hold several active plans at once,
//! so resolution walks a fixed rule list from the highest tier down and the
//! first rule matching any input wins.

use super::catalog::{self, ADVANCED, ESSENTIALS, FREE, PORTFOLIO_BUILDER, Plan, Quota, ResourceKind};

/// Ordered `(pattern, canonical id)` rules, highest tier first.
const RULES: &[(&str, &str)] = &[
    ("portfolio", PORTFOLIO_BUILDER),
    ("builder", PORTFOLIO_BUILDER),
    ("premium", PORTFOLIO_BUILDER),
    ("advanced", ADVANCED),
    ("pro", ADVANCED),
    ("essentials", ESSENTIALS),
    ("starter", ESSENTIALS),
    ("basic", FREE),
    ("free", FREE),
];

/// Pick the single best plan id from a member's active plan identifiers.
///
/// Matching is a case-insensitive substring test. When no rule matches, the
/// first input is passed through unchanged so an unrecognized paid plan is
/// still visible downstream. An empty input yields `None`.
///
/// ```
/// use mib_core::plans::resolve_best_plan;
///
/// let best = resolve_best_plan(&["xyz-essentials-123", "xyz-portfolio-456"]);
/// assert_eq!(best.as_deref(), Some("portfolio-builder"));
/// assert_eq!(resolve_best_plan::<&str>(&[]), None);
/// ```
#[must_use]
pub fn resolve_best_plan<S: AsRef<str>>(plan_ids: &[S]) -> Option<String> {
    let first = plan_ids.first()?;
    let lowered: Vec<String> = plan_ids
        .iter()
        .map(|id| id.as_ref().to_lowercase())
        .collect();

    RULES
        .iter()
        .find(|(pattern, _)| lowered.iter().any(|id| id.contains(pattern)))
        .map_or_else(
            || first.as_ref().to_owned(),
            |(_, canonical)| (*canonical).to_owned(),
        )
        .into()
}

/// The plan a user is treated as holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPlan {
    /// A catalog entry.
    Catalog(&'static Plan),
    /// A vendor id no rule recognized. Shown by its raw id with free-tier
    /// limits.
    Unmapped(String),
}

impl ResolvedPlan {
    /// Resolve a best-plan id (as returned by [`resolve_best_plan`]) to a
    /// plan. `None` is the free tier.
    #[must_use]
    pub fn from_best(best: Option<&str>) -> Self {
        match best {
            None => Self::Catalog(catalog::free()),
            Some(id) => catalog::find(id).map_or_else(|| Self::Unmapped(id.to_owned()), Self::Catalog),
        }
    }

    /// Resolve straight from a list of vendor plan ids.
    #[must_use]
    pub fn from_plan_ids<S: AsRef<str>>(plan_ids: &[S]) -> Self {
        Self::from_best(resolve_best_plan(plan_ids).as_deref())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Catalog(plan) => plan.id,
            Self::Unmapped(raw) => raw,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Catalog(plan) => plan.name,
            Self::Unmapped(raw) => raw,
        }
    }

    #[must_use]
    pub const fn tier(&self) -> u8 {
        match self {
            Self::Catalog(plan) => plan.tier,
            Self::Unmapped(_) => 0,
        }
    }

    #[must_use]
    pub fn quota(&self, kind: ResourceKind) -> Quota {
        match self {
            Self::Catalog(plan) => plan.quota(kind),
            Self::Unmapped(_) => catalog::free().quota(kind),
        }
    }

    /// Whether the user has any paid access.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        self.tier() >= 1
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_tier_wins_regardless_of_order() {
        assert_eq!(
            resolve_best_plan(&["xyz-essentials-123", "xyz-portfolio-456"]).as_deref(),
            Some(PORTFOLIO_BUILDER)
        );
        assert_eq!(
            resolve_best_plan(&["xyz-portfolio-456", "xyz-essentials-123"]).as_deref(),
            Some(PORTFOLIO_BUILDER)
        );
        assert_eq!(
            resolve_best_plan(&["pln_basic-1", "pln_pro-2"]).as_deref(),
            Some(ADVANCED)
        );
    }

    #[test]
    fn test_synonyms() {
        assert_eq!(resolve_best_plan(&["Premium-Annual"]).as_deref(), Some(PORTFOLIO_BUILDER));
        assert_eq!(resolve_best_plan(&["builder"]).as_deref(), Some(PORTFOLIO_BUILDER));
        assert_eq!(resolve_best_plan(&["pln_advanced-ni690fz3"]).as_deref(), Some(ADVANCED));
        assert_eq!(resolve_best_plan(&["STARTER_monthly"]).as_deref(), Some(ESSENTIALS));
        assert_eq!(resolve_best_plan(&["pln_free-abc"]).as_deref(), Some(FREE));
    }

    #[test]
    fn test_unrecognized_passes_through() {
        assert_eq!(
            resolve_best_plan(&["unrecognized-plan-id"]).as_deref(),
            Some("unrecognized-plan-id")
        );
        assert_eq!(
            resolve_best_plan(&["Weird-One", "weird-two"]).as_deref(),
            Some("Weird-One")
        );
    }

    #[test]
    fn test_empty_is_none_and_free() {
        assert_eq!(resolve_best_plan::<String>(&[]), None);
        let plan = ResolvedPlan::from_plan_ids::<String>(&[]);
        assert_eq!(plan.id(), FREE);
        assert_eq!(plan.quota(ResourceKind::PropertyReport), Quota::Limited(0));
        assert_eq!(plan.quota(ResourceKind::SuburbReport), Quota::Limited(0));
        assert!(!plan.is_paid());
    }

    #[test]
    fn test_unmapped_plan_gets_free_limits() {
        let plan = ResolvedPlan::from_plan_ids(&["mystery"]);
        assert_eq!(plan, ResolvedPlan::Unmapped("mystery".to_string()));
        assert_eq!(plan.name(), "mystery");
        assert_eq!(plan.tier(), 0);
        assert_eq!(plan.quota(ResourceKind::SuburbReport), Quota::Limited(0));
    }

    #[test]
    fn test_catalog_resolution() {
        let plan = ResolvedPlan::from_plan_ids(&["pln_advanced-ni690fz3"]);
        assert_eq!(plan.name(), "Advanced");
        assert_eq!(plan.tier(), 2);
        assert!(plan.is_paid());
    }
}
