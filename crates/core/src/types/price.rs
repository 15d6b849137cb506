//! Type-safe price representation using decimal arithmetic.
//!
//! The EazyBuy API sends product prices as decimal strings (`"399.00"`) and
//! cart totals as JSON numbers. Both deserialize into [`rust_decimal::Decimal`]
//! so no precision is lost before display.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
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

    /// A price in the shop's default currency.
    #[must_use]
    pub fn usd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::USD)
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if rounded.is_sign_negative() && !rounded.is_zero() {
            format!("-{}{:.2}", self.currency_code.symbol(), rounded.abs())
        } else {
            format!("{}{:.2}", self.currency_code.symbol(), rounded.abs())
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_display_pads_two_decimals() {
        assert_eq!(Price::usd(dec("399")).display(), "$399.00");
        assert_eq!(Price::usd(dec("89.5")).display(), "$89.50");
    }

    #[test]
    fn test_display_rounds_half_away_from_zero() {
        assert_eq!(Price::usd(dec("0.125")).display(), "$0.13");
        assert_eq!(Price::usd(dec("10.004")).display(), "$10.00");
    }

    #[test]
    fn test_display_zero_and_negative() {
        assert_eq!(Price::usd(Decimal::ZERO).to_string(), "$0.00");
        assert_eq!(Price::usd(dec("-5")).to_string(), "-$5.00");
    }

    #[test]
    fn test_currency_symbols() {
        assert_eq!(Price::new(dec("1"), CurrencyCode::GBP).display(), "£1.00");
        assert_eq!(Price::new(dec("1"), CurrencyCode::EUR).display(), "€1.00");
    }
}
