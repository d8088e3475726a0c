//! # rpclink core
//!
//! Protocol types and configuration for talking JSON-RPC 2.0 to an
//! embedded device.
//!
//! This crate provides:
//! - Request envelopes and a builder
//! - Response parsing and validation
//! - Standard and device-specific error codes
//! - Configuration loading and validation (JSON5 format)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod request;
pub mod response;
pub mod types;
pub mod validation;

pub use config::{Config, ConfigError, TransportKind};
pub use request::{Request, RequestBuilder};
pub use response::{Response, RpcError};
pub use types::{Id, JSONRPC_VERSION, Params};
pub use validation::ProtocolError;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::request::Request;
    pub use crate::response::{Response, RpcError};
    pub use crate::types::*;
}
