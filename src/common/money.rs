//! Money helpers backed by `rust_decimal`.
//!
//! Amounts are stored as `f64` documents; every computation goes through
//! `Decimal` and is rounded to 2 decimal places (half-up) on the way out.

use rust_decimal::prelude::*;

/// Rounding precision for monetary values.
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01).
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Convert a stored `f64` amount into a `Decimal` for arithmetic.
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
}

/// Convert a computed `Decimal` back to the stored representation.
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Round a stored amount to the canonical 2-decimal representation.
pub fn round_money(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// Whether `paid` covers `required` within [`MONEY_TOLERANCE`].
pub fn covers(paid: f64, required: f64) -> bool {
    to_decimal(paid) + MONEY_TOLERANCE >= to_decimal(required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_money(10.005), 10.01);
        assert_eq!(round_money(10.004), 10.0);
    }

    #[test]
    fn covers_within_tolerance() {
        assert!(covers(99.995, 100.0));
        assert!(covers(100.0, 100.0));
        assert!(!covers(99.98, 100.0));
    }

    #[test]
    fn decimal_round_trip_is_exact_for_currency() {
        let total = to_decimal(100_000.0) + to_decimal(15_000.0) - to_decimal(10_000.0);
        assert_eq!(to_f64(total), 105_000.0);
    }
}
