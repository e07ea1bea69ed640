//! Monthly plan price using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A recurring monthly price.
///
/// Plans are billed by the identity vendor, so this type only describes the
/// price for display and for deciding whether signup needs a checkout step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Amount in the currency's standard unit (dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create an AUD price from a whole number of cents.
    #[must_use]
    pub const fn aud_cents(cents: u32) -> Self {
        Self::new(Decimal::from_parts(cents, 0, 0, false, 2), CurrencyCode::AUD)
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2} {}",
            self.currency_code.symbol(),
            self.amount,
            self.currency_code.code()
        )
    }
}

/// ISO 4217 currency codes the plans are sold in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    AUD,
    USD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::AUD | Self::USD => "$",
        }
    }

    /// Three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AUD => "AUD",
            Self::USD => "USD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aud_cents() {
        let price = Price::aud_cents(2900);
        assert_eq!(price.amount, Decimal::new(29, 0));
        assert_eq!(price.currency_code, CurrencyCode::AUD);
        assert!(!price.is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::aud_cents(7900).to_string(), "$79.00 AUD");
    }

    #[test]
    fn test_zero() {
        assert!(Price::aud_cents(0).is_zero());
    }
}
