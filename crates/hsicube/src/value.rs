//! Typed values for textual cube headers.

use std::fmt;

/// A parsed header value.
///
/// Scalars are tried as integer first, then float, and fall back to a
/// plain string. Brace-delimited fields parse to [`Value::List`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Free-form string value.
    String(String),
    /// Comma-separated list value (`{ v1, v2, ... }`).
    List(Vec<Value>),
}

impl Value {
    /// Return the value as `i64` if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Return the value as `usize` if it is a non-negative integer.
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Value::Integer(n) if *n >= 0 => Some(*n as usize),
            _ => None,
        }
    }

    /// Return the value as `f64`, promoting integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Return the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Return a list value as a vector of `f64`, promoting integers.
    ///
    /// Returns `None` if this is not a list or any element is non-numeric.
    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match self {
            Value::List(items) => items.iter().map(Value::as_f64).collect(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// Parse a scalar header value: integer, then float, then string.
pub fn parse_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::Integer(n);
    }
    if let Ok(x) = trimmed.parse::<f64>() {
        return Value::Float(x);
    }
    Value::String(String::from(trimmed))
}

/// Parse the inner text of a brace-delimited list (braces already stripped).
pub fn parse_list(raw: &str) -> Value {
    let items = raw
        .split(',')
        .map(|item| parse_scalar(item))
        .collect::<Vec<_>>();
    Value::List(items)
}
