//! Monetary scale rules and the minor-unit storage encoding.
//!
//! Amounts are carried as [`Decimal`] with exactly two decimal places at the
//! API and persisted as integer minor units so storage arithmetic stays exact.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Decimal places carried by every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Upper bound for a single amount, in minor units.
pub const MAX_AMOUNT_MINOR: i64 = 100_000_000_000_000;

/// Error raised when an amount cannot be encoded as minor units.
#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
    #[error("amount {0} does not fit the minor-unit range")]
    OutOfRange(Decimal),
}

/// Round to the canonical two-decimal scale, half away from zero.
pub fn normalize(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Encode an amount as integer minor units.
pub fn to_minor_units(value: Decimal) -> Result<i64, MoneyError> {
    let normalized = normalize(value);
    let diff = MONEY_SCALE.saturating_sub(normalized.scale());
    let factor = 10i128.pow(diff);
    let minor = normalized
        .mantissa()
        .checked_mul(factor)
        .ok_or(MoneyError::OutOfRange(value))?;
    i64::try_from(minor).map_err(|_| MoneyError::OutOfRange(value))
}

/// Decode integer minor units back into a two-decimal amount.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MONEY_SCALE)
}

/// Largest single amount the ledger accepts.
pub fn max_amount() -> Decimal {
    from_minor_units(MAX_AMOUNT_MINOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn normalizes_half_away_from_zero() {
        assert_eq!(normalize(dec!(10.005)), dec!(10.01));
        assert_eq!(normalize(dec!(-10.005)), dec!(-10.01));
        assert_eq!(normalize(dec!(3)), dec!(3));
    }

    #[test]
    fn minor_units_roundtrip() {
        assert_eq!(to_minor_units(dec!(1234.56)).unwrap(), 123_456);
        assert_eq!(to_minor_units(dec!(5)).unwrap(), 500);
        assert_eq!(to_minor_units(dec!(0.1)).unwrap(), 10);
        assert_eq!(from_minor_units(123_456), dec!(1234.56));
        assert_eq!(from_minor_units(-500), dec!(-5.00));
    }

    #[test]
    fn rejects_amounts_beyond_i64_minor_units() {
        let oversized = Decimal::MAX;
        assert_eq!(
            to_minor_units(oversized),
            Err(MoneyError::OutOfRange(oversized))
        );
    }
}
