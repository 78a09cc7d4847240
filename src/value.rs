// src/value.rs - Attribute value system
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Core value type for event attributes
///
/// Every value an event attribute can carry flows through this enum: the
/// per-category attribute snapshot on a condition, the attribute map on an
/// [`Event`](crate::event::Event), and the reserved ACK_COMMENT / AREAS
/// attributes.
///
/// # Examples
///
/// ```rust
/// use aera::Value;
///
/// let int_val = Value::Int(42);
/// let float_val = Value::Float(3.14);
///
/// assert_eq!(int_val.as_float(), Some(42.0));
/// assert_eq!(Value::Bool(true).as_int(), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating-point value (64-bit)
    Float(f64),
    /// String value
    String(String),
    /// Timestamp value
    Timestamp(DateTime<Utc>),
    /// Array of values (used for the reserved AREAS attribute)
    Array(Vec<Value>),
}

/// Value type enumeration for attribute declarations and type checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    Timestamp,
    Array,
}

impl Value {
    /// Type name for diagnostics and error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
        }
    }

    /// The declared type this value satisfies
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Array(_) => ValueType::Array,
        }
    }

    /// Convert to float where a lossless-enough conversion exists
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Convert to integer where possible
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(if *b { 1 } else { 0 }),
            Value::Float(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// Convert to bool where possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0 && !f.is_nan()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Quality of the process value a condition event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality {
    pub code: QualityCode,
    pub substatus: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCode {
    Good,
    Uncertain,
    Bad,
}

impl Quality {
    pub fn good() -> Self {
        Self {
            code: QualityCode::Good,
            substatus: None,
        }
    }

    pub fn bad() -> Self {
        Self {
            code: QualityCode::Bad,
            substatus: None,
        }
    }

    pub fn uncertain() -> Self {
        Self {
            code: QualityCode::Uncertain,
            substatus: None,
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self.code, QualityCode::Good)
    }

    pub fn is_bad(&self) -> bool {
        matches!(self.code, QualityCode::Bad)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::good()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::Int(10).as_float(), Some(10.0));
        assert_eq!(Value::Bool(true).as_int(), Some(1));
        assert_eq!(Value::Float(42.7).as_int(), Some(42));
        assert_eq!(Value::String("x".into()).as_float(), None);
    }

    #[test]
    fn test_quality_predicates() {
        assert!(Quality::good().is_good());
        assert!(Quality::bad().is_bad());
        assert!(!Quality::uncertain().is_good());
    }

    #[test]
    fn test_value_display() {
        let areas = Value::Array(vec![
            Value::String("Area1".into()),
            Value::String("Area2".into()),
        ]);
        assert_eq!(areas.to_string(), "[Area1, Area2]");
    }
}
