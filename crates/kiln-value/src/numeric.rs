//! Numeric helpers shared by the read and write paths.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round `value` to `precision` decimal places, half away from zero.
///
/// A negative precision means "undefined" and leaves the value untouched, as
/// do values that cannot be represented as a decimal (NaN, infinities, very
/// large magnitudes).
pub fn round(value: f64, precision: i32) -> f64 {
    if precision < 0 {
        return value;
    }

    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(precision as u32, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}
