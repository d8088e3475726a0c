//! # rpclink transport
//!
//! Sessions and request/response exchanges over HTTP, raw TCP and serial.
//!
//! Every transport sits behind the [`Session`] trait and declares how it
//! frames responses ([`FramingPolicy`]). [`Exchange`] drives one request
//! through a session under a single timeout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connector;
pub mod error;
pub mod exchange;
pub mod framing;
pub mod http;
pub mod serial;
pub mod session;
pub mod tcp;

#[cfg(test)]
mod testing;

pub use connector::Connector;
pub use error::{ErrorKind, ExchangeError};
pub use exchange::{DEFAULT_TIMEOUT, Exchange};
pub use framing::{Deadline, FramingPolicy};
pub use http::HttpSession;
pub use serial::{DEFAULT_BAUD_RATE, SerialLink, SerialSession};
pub use session::Session;
pub use tcp::TcpSession;
