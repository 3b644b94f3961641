//! Structured request/response values.

use bytes::Bytes;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// A decoded payload: JSON documents, query values and form fields all map
/// onto this shape before they are walked.
///
/// `Mapping` keeps insertion order, so a walked payload re-serializes with
/// the same key order it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number, kept in its original representation.
    Number(Number),
    /// Text. The only variant a walk ever changes.
    String(String),
    /// Opaque bytes supplied by the host. Never cleaned, and never produced
    /// by decoding JSON.
    Binary(Bytes),
    /// An ordered list.
    Sequence(Vec<PayloadValue>),
    /// Ordered key/value pairs with unique keys.
    Mapping(IndexMap<String, PayloadValue>),
}

impl PayloadValue {
    /// Returns the string slice if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::String(s) => Some(s),
            _ => None,
        }
    }

}

impl From<Value> for PayloadValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PayloadValue::Null,
            Value::Bool(b) => PayloadValue::Bool(b),
            Value::Number(n) => PayloadValue::Number(n),
            Value::String(s) => PayloadValue::String(s),
            Value::Array(items) => {
                PayloadValue::Sequence(items.into_iter().map(PayloadValue::from).collect())
            }
            Value::Object(map) => PayloadValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, PayloadValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<PayloadValue> for Value {
    fn from(value: PayloadValue) -> Self {
        match value {
            PayloadValue::Null => Value::Null,
            PayloadValue::Bool(b) => Value::Bool(b),
            PayloadValue::Number(n) => Value::Number(n),
            PayloadValue::String(s) => Value::String(s),
            PayloadValue::Binary(bytes) => {
                Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
            }
            PayloadValue::Sequence(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            PayloadValue::Mapping(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        PayloadValue::String(s)
    }
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        PayloadValue::String(s.to_string())
    }
}
