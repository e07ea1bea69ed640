//! Small value types shared by the core modules.

pub mod email;
pub mod price;

pub use email::{Email, EmailError};
pub use price::{CurrencyCode, Price};
