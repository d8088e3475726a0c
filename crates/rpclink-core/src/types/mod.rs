//! Core value types shared by requests and responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The only protocol version this crate speaks.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier, echoed verbatim by a well-behaved server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// Integer id.
    Number(i64),
    /// String id.
    String(String),
}

impl Id {
    /// Parse an id from a JSON value.
    ///
    /// Returns `None` for anything other than an integer or a string.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Number),
            Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Id {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Request parameters.
///
/// Positional parameters are the common case on the device; by-name
/// parameters are representable because the wire format permits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    /// Ordered positional parameters.
    Array(Vec<Value>),
    /// Named parameters.
    Object(Map<String, Value>),
    /// A single bare value, as the device's `print_int` expects.
    ///
    /// JSON-RPC 2.0 only allows structured params; servers that follow it
    /// strictly reject this.
    Scalar(Value),
}

impl Params {
    /// Build params from a JSON value.
    ///
    /// Returns `None` for `null`, which means "no params".
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) => Some(Self::Array(items)),
            Value::Object(map) => Some(Self::Object(map)),
            scalar => Some(Self::Scalar(scalar)),
        }
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Array(items) => items.len(),
            Self::Object(map) => map.len(),
            Self::Scalar(_) => 1,
        }
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Value>> for Params {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(value: Map<String, Value>) -> Self {
        Self::Object(value)
    }
}
