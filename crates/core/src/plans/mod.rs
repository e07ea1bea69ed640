//! Subscription plans: the static catalog and vendor plan resolution.

pub mod catalog;
pub mod resolver;

pub use catalog::{PLANS, Plan, Quota, ResourceKind};
pub use resolver::{ResolvedPlan, resolve_best_plan};
