//! Dynamically typed values.
//!
//! Pipeline variables, expression results and score-map outputs all share
//! the `Value` type. It deserializes from plain JSON scalars so block
//! parameters and `vars` maps read naturally.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A scalar flowing through the pipeline.
///
/// `Unresolved` stands for a name nothing could resolve. It behaves as `NaN`
/// in arithmetic and never compares equal to a concrete value.
///
/// # Examples
///
/// ```rust
/// use scorepipe::Value;
///
/// assert_eq!(Value::from(3.5).as_number(), Some(3.5));
/// assert_eq!(Value::from("12").as_number(), Some(12.0));
/// assert!(Value::Unresolved.to_number().is_nan());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
    #[default]
    Unresolved,
}

impl Value {
    /// Numeric view of this value, if it has one.
    ///
    /// Text that parses as a number counts; booleans do not.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Bool(_) | Value::Unresolved => None,
        }
    }

    /// Numeric view for arithmetic: booleans count as 0/1, anything else
    /// without a number is `NaN`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Bool(b) => f64::from(u8::from(*b)),
            other => other.as_number().unwrap_or(f64::NAN),
        }
    }

    /// Truthiness used by `!`, `&&`, `||` and Condition blocks.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::Unresolved => false,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Value::Unresolved)
    }

    /// Loose equality: numeric when both sides have a number, textual
    /// otherwise. `Unresolved` equals nothing, itself included.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unresolved, _) | (_, Value::Unresolved) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => self.to_string() == other.to_string(),
            },
        }
    }

    /// Ordering used by comparison operators.
    ///
    /// Returns `None` when either side is unresolved or a number is `NaN`.
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Unresolved, _) | (_, Value::Unresolved) => None,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => Some(self.to_string().cmp(&other.to_string())),
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Unresolved, Value::Unresolved) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) if n.is_nan() => f.write_str("NaN"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Unresolved => f.write_str("null"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_equality() {
        assert!(Value::from(3.0).loose_eq(&Value::from("3")));
        assert!(Value::from("A").loose_eq(&Value::from("A")));
        assert!(!Value::Unresolved.loose_eq(&Value::Unresolved));
        assert!(!Value::Unresolved.loose_eq(&Value::from(0.0)));
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::from(1.0).is_truthy());
        assert!(!Value::from(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Unresolved.is_truthy());
    }

    #[test]
    fn test_deserialize_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[1.5, "A", true, null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Number(1.5),
                Value::from("A"),
                Value::Bool(true),
                Value::Unresolved
            ]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(85.0).to_string(), "85");
        assert_eq!(Value::from(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Unresolved.to_string(), "null");
    }
}
