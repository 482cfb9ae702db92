//! # Boundary Value Representation
//!
//! This module provides `Value<'a>`, the plain value exchanged at the view
//! boundary: it is what `from_value` encodes and what `get`/`to_value`
//! decode. Text uses `Cow` so decoding borrows straight from the buffer when
//! the bytes are valid UTF-8.
//!
//! ## Value Variants
//!
//! | Variant | Rust Type | Produced by |
//! |---------|-----------|-------------|
//! | Null | - | absent optional field or vector item ("no value") |
//! | Int | i64 | every integer kind except large u64 |
//! | UInt | u64 | u64 values above `i64::MAX` |
//! | Float | f64 | f32/f64 kinds |
//! | Text | Cow<str> | string fields |
//! | List | Vec<Value> | arrays, vectors, collections |
//! | Object | Vec<(Cow<str>, Value)> | fixed and sparse records, in declaration order |
//!
//! ## Missing vs Null
//!
//! An `Object` may omit a key entirely or carry it with `Null`. Encoders treat
//! both as "no value" except for optional map fields that declare a default:
//! a missing key encodes the default, an explicit `Null` stays absent.
//!
//! ## JSON Interop
//!
//! `Value` converts losslessly to and from `serde_json::Value`. Integers that
//! fit `i64` become `Int`, larger ones `UInt`, everything else `Float`.

use eyre::{bail, Result};
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(Cow<'a, str>),
    List(Vec<Value<'a>>),
    Object(Vec<(Cow<'a, str>, Value<'a>)>),
}

impl<'a> Value<'a> {
    /// Builds an object value from `(name, value)` pairs.
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<Cow<'a, str>>,
        I: IntoIterator<Item = (K, Value<'a>)>,
    {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(items: impl IntoIterator<Item = Value<'a>>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn text(s: impl Into<Cow<'a, str>>) -> Self {
        Value::Text(s.into())
    }

    /// Returns the integer that an unsigned value maps to on decode.
    pub fn from_u64(v: u64) -> Self {
        if v <= i64::MAX as u64 {
            Value::Int(v as i64)
        } else {
            Value::UInt(v)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Looks up a key of an object value. `None` means the key is missing,
    /// `Some(&Value::Null)` means it is present but null.
    pub fn field(&self, name: &str) -> Option<&Value<'a>> {
        match self {
            Value::Object(pairs) => pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Like [`Value::field`] but folds missing keys into `Null`.
    pub fn field_or_null(&self, name: &str) -> &Value<'a> {
        self.field(name).unwrap_or(&Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value<'a>]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Reads a number as `i64` with two's-complement wraparound for large
    /// unsigned values and truncation toward zero for floats.
    pub fn to_i64_wrapping(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::UInt(u) => Ok(*u as i64),
            Value::Float(f) => Ok(*f as i64),
            other => bail!("expected a number, got {}", other.kind_name()),
        }
    }

    pub fn to_u64_wrapping(&self) -> Result<u64> {
        match self {
            Value::Int(i) => Ok(*i as u64),
            Value::UInt(u) => Ok(*u),
            Value::Float(f) if *f < 0.0 => Ok(*f as i64 as u64),
            Value::Float(f) => Ok(*f as u64),
            other => bail!("expected a number, got {}", other.kind_name()),
        }
    }

    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::UInt(u) => Ok(*u as f64),
            Value::Float(f) => Ok(*f),
            other => bail!("expected a number, got {}", other.kind_name()),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) | Value::UInt(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    /// Clones this value to a fully-owned static lifetime.
    pub fn to_owned_static(&self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Int(i) => Value::Int(*i),
            Value::UInt(u) => Value::UInt(*u),
            Value::Float(f) => Value::Float(*f),
            Value::Text(s) => Value::Text(Cow::Owned(s.to_string())),
            Value::List(items) => Value::List(items.iter().map(Value::to_owned_static).collect()),
            Value::Object(pairs) => Value::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (Cow::Owned(k.to_string()), v.to_owned_static()))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::UInt(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.to_string()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(pairs) => serde_json::Value::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Value<'static> {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Int(*b as i64),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Text(Cow::Owned(s.clone())),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (Cow::Owned(k.clone()), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value<'static> {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(&json)
    }
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value<'_> {
    fn from(v: u64) -> Self {
        Value::from_u64(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::Text(Cow::Borrowed(s))
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::Text(Cow::Owned(s))
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_conversion_keeps_key_order() {
        let value = Value::from(json!({"b": 1, "a": "x", "c": [1.5, null]}));
        let Value::Object(pairs) = &value else {
            panic!("expected object");
        };
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_ref()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert_eq!(value.to_json(), json!({"b": 1, "a": "x", "c": [1.5, null]}));
    }

    #[test]
    fn large_unsigned_json_numbers_stay_unsigned() {
        assert_eq!(Value::from(json!(u64::MAX)), Value::UInt(u64::MAX));
        assert_eq!(Value::from_u64(5), Value::Int(5));
    }

    #[test]
    fn field_distinguishes_missing_from_null() {
        let value = Value::object([("a", Value::Null)]);
        assert_eq!(value.field("a"), Some(&Value::Null));
        assert_eq!(value.field("b"), None);
        assert_eq!(value.field_or_null("b"), &Value::Null);
    }

    #[test]
    fn numeric_conversions_wrap_and_truncate() {
        assert_eq!(Value::Int(-1).to_u64_wrapping().unwrap(), u64::MAX);
        assert_eq!(Value::UInt(u64::MAX).to_i64_wrapping().unwrap(), -1);
        assert_eq!(Value::Float(-2.9).to_i64_wrapping().unwrap(), -2);
        assert!(Value::text("x").to_f64().is_err());
    }
}
