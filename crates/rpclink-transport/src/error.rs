//! Exchange failures and their classification.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Broad failure class of an [`ExchangeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The transport could not be established.
    Connection,
    /// Write or read failed after the connection was up.
    Transport,
    /// No completion signal within the configured bound.
    Timeout,
    /// Bytes arrived but are not a JSON-RPC response.
    MalformedResponse,
    /// The caller asked for something the exchange cannot do.
    Usage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connection => "connection error",
            Self::Transport => "transport error",
            Self::Timeout => "timeout",
            Self::MalformedResponse => "malformed response",
            Self::Usage => "usage error",
        };
        f.write_str(name)
    }
}

/// Exchange errors.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// TCP connect failed.
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        /// Address that was dialed.
        endpoint: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// Serial port or HTTP client could not be opened.
    #[error("Failed to open {endpoint}: {reason}")]
    Open {
        /// Device path or URL.
        endpoint: String,
        /// Why opening failed.
        reason: String,
    },

    /// IO error on an established stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP server answered with a non-success status and no JSON-RPC body.
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// Status code.
        status: u16,
        /// Response body, lossily decoded.
        body: String,
    },

    /// Response grew past the size limit before it was complete.
    #[error("Response exceeded {limit} bytes")]
    TooLarge {
        /// Limit in bytes.
        limit: usize,
    },

    /// Session was discarded by an earlier failure or already consumed.
    #[error("Session to {endpoint} is no longer usable")]
    Unusable {
        /// Session endpoint.
        endpoint: String,
    },

    /// A shared session's lock was poisoned by a panic mid-exchange.
    #[error("Session lock poisoned by an earlier panic")]
    Poisoned,

    /// Blocking task failed to complete.
    #[error("Task join error: {0}")]
    TaskJoin(String),

    /// Timeout.
    #[error("Operation timed out after {elapsed:?} (limit {limit:?})")]
    Timeout {
        /// Time spent before giving up.
        elapsed: Duration,
        /// Configured bound.
        limit: Duration,
    },

    /// Received bytes are not a valid JSON-RPC response.
    #[error("Malformed response ({reason}): {}", preview(.raw))]
    Malformed {
        /// Validation failure.
        reason: String,
        /// Bytes as received.
        raw: Vec<u8>,
    },

    /// Notifications have no response to wait for.
    #[error("Request has no id; send it as a notification instead")]
    Notification,

    /// Request could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ExchangeError {
    /// Failure class.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. } | Self::Open { .. } => ErrorKind::Connection,
            Self::Http(e) if e.is_connect() => ErrorKind::Connection,
            Self::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Io(_)
            | Self::Http(_)
            | Self::HttpStatus { .. }
            | Self::TooLarge { .. }
            | Self::Unusable { .. }
            | Self::Poisoned
            | Self::TaskJoin(_) => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Malformed { .. } => ErrorKind::MalformedResponse,
            Self::Notification | Self::Serialize(_) => ErrorKind::Usage,
        }
    }

    /// Whether the session must be closed after this failure.
    ///
    /// Partial reads leave residual bytes that belong to the in-flight
    /// message, so the stream cannot be resynchronized.
    #[must_use]
    pub fn discards_session(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Timeout)
    }

    /// Raw payload attached to a malformed response.
    #[must_use]
    pub fn raw(&self) -> Option<&[u8]> {
        match self {
            Self::Malformed { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

const PREVIEW_BYTES: usize = 256;

fn preview(raw: &[u8]) -> String {
    if raw.is_empty() {
        return "<empty>".to_string();
    }
    let shown = &raw[..raw.len().min(PREVIEW_BYTES)];
    let mut text = String::from_utf8_lossy(shown).into_owned();
    if raw.len() > PREVIEW_BYTES {
        text.push_str("...");
    }
    text
}

/// Whether an IO error is a read/write timeout.
///
/// Unix reports an expired `SO_RCVTIMEO` as `WouldBlock`, Windows as
/// `TimedOut`.
pub(crate) fn is_timeout(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}
