//! MiB Core - plan, entitlement and identity rules for the MiB web app.
//!
//! Everything in this crate is pure: no I/O, no HTTP clients, no session
//! storage. The web crate owns those and calls in here for decisions.
//!
//! # Modules
//!
//! - [`plans`] - Static catalog and vendor plan resolution
//! - [`entitlement`] - Monthly usage counting, remaining quota, tier features
//! - [`identity`] - Vendor members, session users, auth request bodies
//! - [`vendor`] - Client-side identity SDK bridge and error decoding
//! - [`auth_flow`] - Login/signup state machine
//! - [`error`] - Closed error-kind enumeration
//! - [`types`] - Email and price value types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth_flow;
pub mod entitlement;
pub mod error;
pub mod identity;
pub mod plans;
pub mod types;
pub mod vendor;

pub use error::ErrorKind;
pub use types::*;
