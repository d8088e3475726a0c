//! Transport sessions.

use crate::error::ExchangeError;
use crate::framing::{Deadline, FramingPolicy};

/// An exclusively-owned byte-stream handle to the device.
///
/// A session carries one exchange at a time. It is not synchronized; share
/// it across threads only behind a lock.
pub trait Session: Send {
    /// How this transport frames responses.
    fn policy(&self) -> FramingPolicy;

    /// Human-readable endpoint (URL, `host:port`, or device path).
    fn endpoint(&self) -> &str;

    /// Whether the session can carry another exchange.
    fn is_usable(&self) -> bool;

    /// Write the whole payload.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails or the deadline passes.
    fn send(&mut self, payload: &[u8], deadline: &Deadline) -> Result<(), ExchangeError>;

    /// Read one complete response according to [`Session::policy`].
    ///
    /// # Errors
    ///
    /// Returns error if the read fails or the deadline passes.
    fn receive(&mut self, deadline: &Deadline) -> Result<Vec<u8>, ExchangeError>;

    /// Release the underlying handle. Later exchanges fail as unusable.
    fn close(&mut self);
}

impl<S: Session + ?Sized> Session for Box<S> {
    fn policy(&self) -> FramingPolicy {
        (**self).policy()
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    fn is_usable(&self) -> bool {
        (**self).is_usable()
    }

    fn send(&mut self, payload: &[u8], deadline: &Deadline) -> Result<(), ExchangeError> {
        (**self).send(payload, deadline)
    }

    fn receive(&mut self, deadline: &Deadline) -> Result<Vec<u8>, ExchangeError> {
        (**self).receive(deadline)
    }

    fn close(&mut self) {
        (**self).close();
    }
}
