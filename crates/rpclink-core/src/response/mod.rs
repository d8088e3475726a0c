//! JSON-RPC response envelope.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::request::Request;
use crate::types::{Id, JSONRPC_VERSION};
use crate::validation::ProtocolError;

/// A JSON-RPC 2.0 response: exactly one of a result or an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Successful call.
    Result {
        /// Id of the request being answered.
        id: Id,
        /// Return value, possibly `null`.
        result: Value,
    },
    /// Failed call reported by the server.
    Error {
        /// Id of the request being answered; `None` when the server could
        /// not read it (e.g. parse errors).
        id: Option<Id>,
        /// Error details.
        error: RpcError,
    },
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Create an error without data.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Short name for a well-known code.
    #[must_use]
    pub const fn code_name(&self) -> Option<&'static str> {
        code_name(self.code)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for RpcError {}

// Standard JSON-RPC error codes
/// Parse error.
pub const PARSE_ERROR: i64 = -32700;
/// Invalid request.
pub const INVALID_REQUEST: i64 = -32600;
/// Method not found.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid params.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal error.
pub const INTERNAL_ERROR: i64 = -32603;

// Device-specific codes (server error range)
/// Response did not fit the device's output buffer.
pub const RESPONSE_TOO_LARGE: i64 = -32000;
/// Request did not fit the device's input buffer.
pub const REQUEST_TOO_LARGE: i64 = -32001;
/// Request nesting exceeded the device's parser depth.
pub const REQUEST_TOO_DEEP: i64 = -32002;

/// Short name for a well-known error code.
#[must_use]
pub const fn code_name(code: i64) -> Option<&'static str> {
    match code {
        PARSE_ERROR => Some("Parse error"),
        INVALID_REQUEST => Some("Invalid request"),
        METHOD_NOT_FOUND => Some("Method not found"),
        INVALID_PARAMS => Some("Invalid params"),
        INTERNAL_ERROR => Some("Internal error"),
        RESPONSE_TOO_LARGE => Some("Response too large"),
        REQUEST_TOO_LARGE => Some("Request too large"),
        REQUEST_TOO_DEEP => Some("Request too deep"),
        _ => None,
    }
}

impl Response {
    /// Create a success response.
    #[must_use]
    pub fn success(id: impl Into<Id>, result: Value) -> Self {
        Self::Result {
            id: id.into(),
            result,
        }
    }

    /// Create an error response.
    #[must_use]
    pub const fn error(id: Option<Id>, error: RpcError) -> Self {
        Self::Error { id, error }
    }

    /// Parse and validate a response from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not JSON, not an object, carry the
    /// wrong version, or carry both or neither of `result` and `error`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Validate a response from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// See [`Response::from_slice`].
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut object) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        match object.get("jsonrpc") {
            Some(Value::String(v)) if v == JSONRPC_VERSION => {}
            Some(other) => return Err(ProtocolError::Version(other.to_string())),
            None => return Err(ProtocolError::Version("missing".to_string())),
        }

        let id = match object.remove("id") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(
                Id::from_value(&raw).ok_or_else(|| ProtocolError::InvalidId(raw.to_string()))?,
            ),
        };

        match (object.remove("result"), object.remove("error")) {
            (Some(_), Some(_)) => Err(ProtocolError::ResultAndError),
            (None, None) => Err(ProtocolError::NoResultOrError),
            (Some(result), None) => {
                let id = id.ok_or_else(|| ProtocolError::InvalidId("null".to_string()))?;
                Ok(Self::Result { id, result })
            }
            (None, Some(raw)) => {
                let error: RpcError = serde_json::from_value(raw)
                    .map_err(|e| ProtocolError::InvalidError(e.to_string()))?;
                Ok(Self::Error { id, error })
            }
        }
    }

    /// Id of the request this response answers.
    #[must_use]
    pub const fn id(&self) -> Option<&Id> {
        match self {
            Self::Result { id, .. } => Some(id),
            Self::Error { id, .. } => id.as_ref(),
        }
    }

    /// Whether the server reported an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The result value, if successful.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match self {
            Self::Result { result, .. } => Some(result),
            Self::Error { .. } => None,
        }
    }

    /// The error object, if failed.
    #[must_use]
    pub const fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            Self::Result { .. } => None,
            Self::Error { error, .. } => Some(error),
        }
    }

    /// Whether this response carries the id of `request`.
    #[must_use]
    pub fn answers(&self, request: &Request) -> bool {
        match (self.id(), request.id()) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        }
    }

    /// Convert into the result value or the remote error.
    ///
    /// # Errors
    ///
    /// Returns the `RpcError` when the server reported one.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self {
            Self::Result { result, .. } => Ok(result),
            Self::Error { error, .. } => Err(error),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        match self {
            Self::Result { id, result } => {
                map.serialize_entry("result", result)?;
                map.serialize_entry("id", id)?;
            }
            Self::Error { id, error } => {
                map.serialize_entry("error", error)?;
                map.serialize_entry("id", id)?;
            }
        }
        map.end()
    }
}
