//! Price coercion using decimal arithmetic.
//!
//! Prices arrive from product payloads and from documents written by other
//! clients, so they may be numbers, numeric strings, or garbage. Two
//! coercions are supported:
//!
//! - [`coerce_number`] is strict: the whole value must be numeric (after
//!   trimming), otherwise the result is zero.
//! - [`parse_leading_number`] accepts the longest numeric prefix of a string
//!   (`"12.50 USD"` parses as `12.50`), and is used for free-form `price`
//!   fields on product input.
//!
//! Amounts are never negative; anything below zero is clamped to zero.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

/// ISO 4217 code assumed when a product carries no currency.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Strictly coerce a JSON value into a non-negative amount.
///
/// | input | result |
/// | --- | --- |
/// | number | the number |
/// | string | the trimmed string parsed as a decimal, `""` is zero |
/// | `true` / `false` | one / zero |
/// | anything else | zero |
///
/// Non-finite or unparsable values coerce to zero.
#[must_use]
pub fn coerce_number(value: &Value) -> Decimal {
    let amount = match value {
        Value::Number(n) => number_to_decimal(n),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(Decimal::ZERO)
            } else {
                parse_decimal(trimmed)
            }
        }
        Value::Bool(true) => Some(Decimal::ONE),
        _ => None,
    };
    clamp(amount.unwrap_or(Decimal::ZERO))
}

/// Coerce a free-form price field.
///
/// Numbers are taken as-is; strings use [`parse_leading_number`]. Anything
/// else is zero.
#[must_use]
pub fn coerce_loose(value: &Value) -> Decimal {
    let amount = match value {
        Value::Number(n) => number_to_decimal(n),
        Value::String(s) => parse_leading_number(s),
        _ => None,
    };
    clamp(amount.unwrap_or(Decimal::ZERO))
}

/// Parse the longest numeric prefix of `input`.
///
/// Leading whitespace is skipped. The prefix may carry a sign, a fractional
/// part, and an exponent. Returns `None` when no digits are found.
///
/// ```
/// use cartsync_core::parse_leading_number;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_leading_number("  12.5abc"), Some(Decimal::new(125, 1)));
/// assert_eq!(parse_leading_number(".5"), Some(Decimal::new(5, 1)));
/// assert_eq!(parse_leading_number("abc"), None);
/// ```
#[must_use]
pub fn parse_leading_number(input: &str) -> Option<Decimal> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts if at least one digit follows it.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s.get(..end).and_then(parse_decimal)
}

/// Convert a decimal amount into a JSON number.
///
/// Whole amounts become integers so documents read `10` rather than `10.0`.
#[must_use]
pub fn decimal_to_json(amount: Decimal) -> Value {
    if amount.fract().is_zero()
        && let Some(whole) = amount.to_i64()
    {
        return Value::from(whole);
    }
    amount
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::from(0), Value::Number)
}

fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    parse_decimal(&n.to_string()).or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok()))
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.strip_prefix('+').unwrap_or(s);
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn clamp(amount: Decimal) -> Decimal {
    if amount.is_sign_negative() {
        Decimal::ZERO
    } else {
        amount
    }
}

/// Serde adapter for price fields: written as JSON numbers, read leniently
/// with [`coerce_number`].
pub mod serde_price {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    /// Serialize a price as a JSON number.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        super::decimal_to_json(*amount).serialize(serializer)
    }

    /// Deserialize a price from any JSON value, coercing garbage to zero.
    ///
    /// # Errors
    ///
    /// Only fails if the underlying deserializer cannot produce a value.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(super::coerce_number(&value))
    }
}
