//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
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

    /// Amount in the smallest currency unit (cents), rounded half away from zero.
    ///
    /// Returns `None` if the value does not fit in an `i64`.
    #[must_use]
    pub fn minor_units(&self) -> Option<i64> {
        self.amount
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }
}

impl fmt::Display for Price {
    /// Formats as symbol plus two decimal places, e.g. `$19.99`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{}{rounded:.2}", self.currency_code.symbol())
    }
}

/// Largest amount a stored price or total may hold (`NUMERIC(12, 2)`).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Why a money amount cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount must have at most two decimal places")]
    TooPrecise,
    #[error("amount out of range")]
    OutOfRange,
}

/// Check that `amount` fits a stored money column exactly.
///
/// Trailing zeros beyond the second place are ignored, so `10.000` passes.
///
/// # Errors
///
/// Returns the first [`AmountError`] that applies.
pub fn check_amount(amount: Decimal) -> Result<(), AmountError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative);
    }
    if amount > MAX_AMOUNT {
        return Err(AmountError::OutOfRange);
    }
    if amount.normalize().scale() > 2 {
        return Err(AmountError::TooPrecise);
    }
    Ok(())
}

/// ISO 4217 currency codes accepted by the store.
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
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Upper-case ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_display_formats_two_places() {
        let price = Price::new(Decimal::from_str("9.9").unwrap(), CurrencyCode::USD);
        assert_eq!(price.to_string(), "$9.90");

        let price = Price::new(Decimal::from_str("12.345").unwrap(), CurrencyCode::GBP);
        assert_eq!(price.to_string(), "£12.35");
    }

    #[test]
    fn test_minor_units() {
        let price = Price::new(Decimal::from_str("19.99").unwrap(), CurrencyCode::USD);
        assert_eq!(price.minor_units(), Some(1999));

        let price = Price::new(Decimal::from_str("0.005").unwrap(), CurrencyCode::USD);
        assert_eq!(price.minor_units(), Some(1));
    }

    #[test]
    fn test_minor_units_overflow_is_none() {
        let price = Price::new(Decimal::MAX, CurrencyCode::USD);
        assert_eq!(price.minor_units(), None);
    }

    #[test]
    fn test_max_amount() {
        assert_eq!(MAX_AMOUNT, Decimal::from_str("9999999999.99").unwrap());
    }

    #[test]
    fn test_check_amount() {
        let amount = |s: &str| check_amount(Decimal::from_str(s).unwrap());

        assert_eq!(amount("0"), Ok(()));
        assert_eq!(amount("19.99"), Ok(()));
        assert_eq!(amount("10.000"), Ok(()));
        assert_eq!(amount("9999999999.99"), Ok(()));
        assert_eq!(amount("-0.01"), Err(AmountError::Negative));
        assert_eq!(amount("9.999"), Err(AmountError::TooPrecise));
        assert_eq!(amount("100000000000"), Err(AmountError::OutOfRange));
        assert_eq!(check_amount(Decimal::MAX), Err(AmountError::OutOfRange));
    }

    #[test]
    fn test_currency_parse_is_case_insensitive() {
        assert_eq!("eur".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!("JPY".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_decimal_serializes_as_string() {
        let price = Price::new(Decimal::from_str("9.99").unwrap(), CurrencyCode::USD);
        let json = serde_json::to_value(price).unwrap();
        assert_eq!(json["amount"], "9.99");
        assert_eq!(json["currency_code"], "USD");
    }
}
