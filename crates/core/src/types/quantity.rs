//! Quantity coercion.
//!
//! Quantities come from form fields and from stored documents. Both are
//! coerced with integer-prefix parsing: `"3"`, `"3.9"`, and `"3 items"` all
//! read as `3`.

use serde_json::Value;

/// Raw quantity input before coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityInput {
    /// A parsed integer (may be zero or negative).
    Number(i64),
    /// Input that did not contain an integer.
    Invalid,
}

impl QuantityInput {
    /// Parse textual input using integer-prefix rules.
    ///
    /// ```
    /// use cartsync_core::QuantityInput;
    ///
    /// assert_eq!(QuantityInput::parse(" 4 "), QuantityInput::Number(4));
    /// assert_eq!(QuantityInput::parse("2.5"), QuantityInput::Number(2));
    /// assert_eq!(QuantityInput::parse("-1"), QuantityInput::Number(-1));
    /// assert_eq!(QuantityInput::parse("many"), QuantityInput::Invalid);
    /// ```
    #[must_use]
    pub fn parse(input: &str) -> Self {
        parse_leading_int(input).map_or(Self::Invalid, Self::Number)
    }

    /// Quantity to add: invalid or non-positive input becomes one.
    #[must_use]
    pub fn for_add(self) -> u32 {
        match self {
            Self::Number(n) if n >= 1 => saturate(n),
            _ => 1,
        }
    }

    /// Quantity for an update: `None` means the item should be removed.
    ///
    /// Invalid input becomes one; zero or below removes.
    #[must_use]
    pub fn for_update(self) -> Option<u32> {
        match self {
            Self::Number(n) if n <= 0 => None,
            Self::Number(n) => Some(saturate(n)),
            Self::Invalid => Some(1),
        }
    }
}

impl From<i64> for QuantityInput {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for QuantityInput {
    fn from(n: i32) -> Self {
        Self::Number(i64::from(n))
    }
}

impl From<u32> for QuantityInput {
    fn from(n: u32) -> Self {
        Self::Number(i64::from(n))
    }
}

/// Coerce a stored quantity. Anything unparsable or negative counts as zero.
#[must_use]
pub fn coerce_stored(value: &Value) -> u32 {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().and_then(|f| parse_leading_int(&f.to_string()))),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    };
    parsed.map_or(0, |n| if n <= 0 { 0 } else { saturate(n) })
}

fn parse_leading_int(input: &str) -> Option<i64> {
    let s = input.trim();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, s.get(1..)?),
        Some(b'+') => (false, s.get(1..)?),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let run = digits.get(..end).filter(|d| !d.is_empty())?;
    // Digit runs too long for i64 saturate like any other oversized quantity
    let magnitude: i64 = run.parse().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

fn saturate(n: i64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Serde adapter for quantity fields: written as integers, read leniently.
pub mod serde_quantity {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Deserialize a quantity from any JSON value.
    ///
    /// # Errors
    ///
    /// Only fails if the underlying deserializer cannot produce a value.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(super::coerce_stored(&value))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_for_add_defaults_to_one() {
        assert_eq!(QuantityInput::Number(3).for_add(), 3);
        assert_eq!(QuantityInput::Number(0).for_add(), 1);
        assert_eq!(QuantityInput::Number(-2).for_add(), 1);
        assert_eq!(QuantityInput::Invalid.for_add(), 1);
    }

    #[test]
    fn test_for_update_removes_at_zero_or_below() {
        assert_eq!(QuantityInput::Number(0).for_update(), None);
        assert_eq!(QuantityInput::Number(-5).for_update(), None);
        assert_eq!(QuantityInput::Number(7).for_update(), Some(7));
        assert_eq!(QuantityInput::Invalid.for_update(), Some(1));
    }

    #[test]
    fn test_parse_rejects_empty_sign() {
        assert_eq!(QuantityInput::parse("-"), QuantityInput::Invalid);
        assert_eq!(QuantityInput::parse(""), QuantityInput::Invalid);
    }

    #[test]
    fn test_coerce_stored() {
        assert_eq!(coerce_stored(&json!(2)), 2);
        assert_eq!(coerce_stored(&json!("5")), 5);
        assert_eq!(coerce_stored(&json!(2.9)), 2);
        assert_eq!(coerce_stored(&json!("x")), 0);
        assert_eq!(coerce_stored(&json!(-3)), 0);
        assert_eq!(coerce_stored(&json!(null)), 0);
    }

    #[test]
    fn test_saturates_huge_values() {
        assert_eq!(QuantityInput::Number(i64::MAX).for_add(), u32::MAX);
    }

    #[test]
    fn test_parse_saturates_overlong_digit_runs() {
        let huge = QuantityInput::parse("99999999999999999999");
        assert_eq!(huge, QuantityInput::Number(i64::MAX));
        assert_eq!(huge.for_add(), u32::MAX);
        assert_eq!(huge.for_update(), Some(u32::MAX));

        let negative = QuantityInput::parse("-99999999999999999999 items");
        assert_eq!(negative, QuantityInput::Number(-i64::MAX));
        assert_eq!(negative.for_update(), None);
    }
}
