//! Business logic services.
//!
//! - `entitlement` - Plan, monthly usage and feature snapshot for a session user

pub mod entitlement;

pub use entitlement::EntitlementService;
