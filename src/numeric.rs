//! Float-safe rounding helpers.
//!
//! Binary floating point cannot represent most decimal fractions, so a naive
//! `(2.345 * 100.0).round() / 100.0` yields `2.34`. Every helper here first
//! re-quantizes its operand to 15 significant digits, then shifts the decimal
//! point through the decimal exponent (`"2.345e2"`) instead of multiplying,
//! so the base rule sees the value a person would have written.

use serde::{Deserialize, Serialize};

/// Significant digits kept when re-quantizing an operand.
const SIGNIFICANT_DIGITS: usize = 15;

/// Extra digits pre-rounded before truncating.
const TRUNCATE_GUARD_DIGITS: i32 = 2;

/// Re-quantize `value` to [`SIGNIFICANT_DIGITS`] significant digits.
fn quantize(value: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }
    format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value)
        .parse()
        .unwrap_or(value)
}

/// Move the decimal point of `value` by `digits` places.
fn shift(value: f64, digits: i32) -> f64 {
    format!("{value}e{digits}").parse().unwrap_or(value)
}

fn apply_scaled(value: f64, digits: i32, rule: fn(f64) -> f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scaled = shift(quantize(value), digits);
    shift(rule(scaled), -digits)
}

/// Round half away from zero to `digits` decimal places.
///
/// # Examples
///
/// ```rust
/// use scorepipe::numeric::round;
///
/// assert_eq!(round(2.345, 2), 2.35);
/// assert_eq!(round(1234.0, -2), 1200.0);
/// ```
pub fn round(value: f64, digits: i32) -> f64 {
    apply_scaled(value, digits, f64::round)
}

/// Round toward negative infinity at `digits` decimal places.
pub fn floor(value: f64, digits: i32) -> f64 {
    apply_scaled(value, digits, f64::floor)
}

/// Round toward positive infinity at `digits` decimal places.
pub fn ceil(value: f64, digits: i32) -> f64 {
    apply_scaled(value, digits, f64::ceil)
}

/// Drop everything past `digits` decimal places.
///
/// The operand is pre-rounded two digits further than requested, so a value
/// stored as `0.28999999999999998` truncates like `0.29`.
///
/// # Examples
///
/// ```rust
/// use scorepipe::numeric::truncate;
///
/// assert_eq!(truncate(1.999, 2), 1.99);
/// assert_eq!(truncate(0.29, 2), 0.29);
/// ```
pub fn truncate(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let guarded = round(value, digits.saturating_add(TRUNCATE_GUARD_DIGITS));
    apply_scaled(guarded, digits, f64::trunc)
}

/// Rounding rule selected by a Decimal block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimalMethod {
    #[default]
    Round,
    Floor,
    Ceil,
    #[serde(alias = "trunc")]
    Truncate,
}

impl DecimalMethod {
    /// Apply this rule at `digits` decimal places.
    pub fn apply(self, value: f64, digits: i32) -> f64 {
        match self {
            DecimalMethod::Round => round(value, digits),
            DecimalMethod::Floor => floor(value, digits),
            DecimalMethod::Ceil => ceil(value, digits),
            DecimalMethod::Truncate => truncate(value, digits),
        }
    }
}
