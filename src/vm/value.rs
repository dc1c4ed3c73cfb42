//! Runtime values.
//!
//! A [`Value`] is always exactly one of `nil`, a boolean, a double or an owned
//! string; the enum makes a tag/payload mismatch unrepresentable.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
}

impl PartialEq for Value {
    /// Type first, then value. Values of different variants are never equal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// `nil` and `false` are falsey; everything else, including `0`, is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    /// Applies a numeric binary operator; `None` unless both sides are numbers.
    pub fn numeric_binary(&self, rhs: &Value, op: impl FnOnce(f64, f64) -> Value) -> Option<Value> {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Some(op(*a, *b)),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_type_then_value() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_eq!(Value::from("abc"), Value::from("abc"));
        assert_ne!(Value::Number(1.0), Value::Bool(true));
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::from("1"), Value::Number(1.0));
    }

    #[test]
    fn test_nan_is_not_equal_to_itself() {
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Nil.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Number(0.0).is_falsey());
        assert!(!Value::from("").is_falsey());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::from("hi").to_string(), "hi");
    }

    #[test]
    fn test_numeric_binary_rejects_mixed_operands() {
        let sum = Value::Number(1.0).numeric_binary(&Value::Number(2.0), |a, b| Value::Number(a + b));
        assert_eq!(sum, Some(Value::Number(3.0)));
        let mixed = Value::Number(1.0).numeric_binary(&Value::Nil, |a, b| Value::Number(a + b));
        assert_eq!(mixed, None);
    }
}
