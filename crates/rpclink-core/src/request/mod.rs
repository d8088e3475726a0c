//! JSON-RPC request envelope and its builder.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Id, JSONRPC_VERSION, Params};
use crate::validation::{ProtocolError, validate_method};

/// A JSON-RPC 2.0 request.
///
/// Immutable once built. A request without an id is a notification and
/// expects no response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRequest")]
pub struct Request {
    jsonrpc: String,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Params>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Id>,
}

/// Unvalidated wire form.
#[derive(Deserialize)]
struct RawRequest {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Option<Params>,
    #[serde(default)]
    id: Option<Id>,
}

impl TryFrom<RawRequest> for Request {
    type Error = ProtocolError;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        if raw.jsonrpc != JSONRPC_VERSION {
            return Err(ProtocolError::Version(raw.jsonrpc));
        }
        validate_method(&raw.method)?;
        Ok(Self {
            jsonrpc: raw.jsonrpc,
            method: raw.method,
            params: raw.params,
            id: raw.id,
        })
    }
}

impl Request {
    /// Build a request with positional parameters.
    ///
    /// Passing `None` for `id` produces a notification.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::EmptyMethod` if `method` is blank.
    pub fn build(
        method: impl Into<String>,
        params: Option<Vec<Value>>,
        id: Option<Id>,
    ) -> Result<Self, ProtocolError> {
        let mut builder = Self::builder(method);
        if let Some(values) = params {
            builder = builder.params(values);
        }
        if let Some(id) = id {
            builder = builder.id(id);
        }
        builder.build()
    }

    /// Start building a request.
    #[must_use]
    pub fn builder(method: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            method: method.into(),
            params: None,
            id: None,
        }
    }

    /// Build a notification.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::EmptyMethod` if `method` is blank.
    pub fn notification(
        method: impl Into<String>,
        params: Option<Params>,
    ) -> Result<Self, ProtocolError> {
        let mut builder = Self::builder(method);
        builder.params = params;
        builder.build()
    }

    /// Protocol version, always "2.0".
    #[must_use]
    pub fn jsonrpc(&self) -> &str {
        &self.jsonrpc
    }

    /// Method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Parameters, if any.
    #[must_use]
    pub const fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// Request id, `None` for notifications.
    #[must_use]
    pub const fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// Whether this request is a notification.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Serialize to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if a parameter value cannot be serialized.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse a request from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid request envelope.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let raw: RawRequest = serde_json::from_slice(bytes)?;
        Self::try_from(raw)
    }
}

/// Builder for [`Request`].
#[derive(Debug, Clone)]
#[must_use]
pub struct RequestBuilder {
    method: String,
    params: Option<Params>,
    id: Option<Id>,
}

impl RequestBuilder {
    /// Append one positional parameter.
    ///
    /// Replaces any named parameters set earlier.
    pub fn param(mut self, value: impl Into<Value>) -> Self {
        match &mut self.params {
            Some(Params::Array(items)) => items.push(value.into()),
            _ => self.params = Some(Params::Array(vec![value.into()])),
        }
        self
    }

    /// Set all positional parameters at once.
    pub fn params(mut self, values: Vec<Value>) -> Self {
        self.params = Some(Params::Array(values));
        self
    }

    /// Add one named parameter.
    ///
    /// Replaces any positional parameters set earlier.
    pub fn named(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        match &mut self.params {
            Some(Params::Object(map)) => {
                map.insert(key.into(), value.into());
            }
            _ => {
                let mut map = Map::new();
                map.insert(key.into(), value.into());
                self.params = Some(Params::Object(map));
            }
        }
        self
    }

    /// Replace the parameters with an already-shaped value.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the request id. Without one the request is a notification.
    pub fn id(mut self, id: impl Into<Id>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Finish the request.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::EmptyMethod` if the method is blank.
    pub fn build(self) -> Result<Request, ProtocolError> {
        validate_method(&self.method)?;
        Ok(Request {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: self.method,
            params: self.params,
            id: self.id,
        })
    }
}
