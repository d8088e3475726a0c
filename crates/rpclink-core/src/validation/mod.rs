//! Envelope validation errors and size limits.

use thiserror::Error;

/// Errors raised while building or validating a JSON-RPC envelope.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Request method is empty.
    #[error("Method name cannot be empty")]
    EmptyMethod,

    /// Payload is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is valid JSON but not an object.
    #[error("Expected a JSON object")]
    NotAnObject,

    /// `jsonrpc` member missing or not "2.0".
    #[error("Unsupported jsonrpc version: {0}")]
    Version(String),

    /// Both `result` and `error` are present.
    #[error("Response carries both result and error")]
    ResultAndError,

    /// Neither `result` nor `error` is present.
    #[error("Response carries neither result nor error")]
    NoResultOrError,

    /// `id` is present but is not an integer, string, or null.
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// `error` member does not have the `{code, message, data?}` shape.
    #[error("Invalid error object: {0}")]
    InvalidError(String),
}

/// Size limits.
pub mod limits {
    /// Maximum accepted response size (1MB).
    ///
    /// The device caps its own documents at a few kilobytes, so anything
    /// past this is a runaway stream rather than a reply.
    pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

    /// Chunk size for stream reads.
    pub const READ_CHUNK_BYTES: usize = 1024;
}

/// Validate a method name.
///
/// # Errors
///
/// Returns `ProtocolError::EmptyMethod` if the name is empty or blank.
pub fn validate_method(method: &str) -> Result<(), ProtocolError> {
    if method.trim().is_empty() {
        return Err(ProtocolError::EmptyMethod);
    }
    Ok(())
}
