//! One request out, one response back.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rpclink_core::{Request, Response};

use crate::error::ExchangeError;
use crate::framing::Deadline;
use crate::session::Session;

/// Default bound on a whole exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs request/response exchanges over any [`Session`].
///
/// Blocking. The timeout bounds send and receive together; once it fires
/// the session is closed, since the unread remainder of the reply would
/// corrupt the next exchange. No retries: a retried call could invoke a
/// non-idempotent method twice.
#[derive(Debug, Clone, Copy)]
pub struct Exchange {
    timeout: Duration,
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Exchange {
    /// Create an exchange with the given timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Get the configured timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request and wait for its response.
    ///
    /// A server-reported error is returned as `Ok(Response::Error { .. })`.
    /// Matching the response id against the request is left to the caller
    /// (see [`Response::answers`]).
    ///
    /// # Errors
    ///
    /// Returns `Notification` for requests without an id, `Unusable` if
    /// the session was already discarded, transport and timeout failures
    /// (after closing the session), and `Malformed` if the reply is not a
    /// JSON-RPC response.
    pub fn call<S: Session + ?Sized>(
        &self,
        session: &mut S,
        request: &Request,
    ) -> Result<Response, ExchangeError> {
        if request.is_notification() {
            return Err(ExchangeError::Notification);
        }

        let raw = self.round_trip(session, request, true)?;
        Response::from_slice(&raw).map_err(|e| {
            tracing::warn!("Malformed response from {}: {}", session.endpoint(), e);
            ExchangeError::Malformed {
                reason: e.to_string(),
                raw,
            }
        })
    }

    /// Send a notification without waiting for a reply.
    ///
    /// One-shot sessions (HTTP, TCP) are closed afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Unusable` if the session was already discarded, and
    /// transport and timeout failures (after closing the session).
    pub fn notify<S: Session + ?Sized>(
        &self,
        session: &mut S,
        request: &Request,
    ) -> Result<(), ExchangeError> {
        self.round_trip(session, request, false)?;
        if session.policy().is_one_shot() {
            session.close();
        }
        Ok(())
    }

    /// Run [`Exchange::call`] on the blocking pool for async callers.
    ///
    /// The mutex is the external synchronization a session needs when it is
    /// reachable from more than one task.
    ///
    /// # Errors
    ///
    /// As for [`Exchange::call`]; `Poisoned` if an earlier holder of the
    /// lock panicked, `TaskJoin` if the blocking task panics.
    pub async fn call_shared<S: Session + 'static>(
        &self,
        session: Arc<Mutex<S>>,
        request: Request,
    ) -> Result<Response, ExchangeError> {
        let exchange = *self;

        tokio::task::spawn_blocking(move || {
            let mut guard = session.lock().map_err(|_| ExchangeError::Poisoned)?;
            exchange.call(&mut *guard, &request)
        })
        .await
        .map_err(|e| ExchangeError::TaskJoin(e.to_string()))?
    }

    fn round_trip<S: Session + ?Sized>(
        &self,
        session: &mut S,
        request: &Request,
        expect_reply: bool,
    ) -> Result<Vec<u8>, ExchangeError> {
        if !session.is_usable() {
            return Err(ExchangeError::Unusable {
                endpoint: session.endpoint().to_string(),
            });
        }

        let payload = request.to_vec()?;
        let deadline = Deadline::after(self.timeout);
        tracing::debug!(
            "Sending {} bytes to {} ({})",
            payload.len(),
            session.endpoint(),
            session.policy()
        );

        let result = session.send(&payload, &deadline).and_then(|()| {
            if expect_reply {
                session.receive(&deadline)
            } else {
                Ok(Vec::new())
            }
        });

        match result {
            Ok(raw) => {
                if expect_reply {
                    tracing::debug!(
                        "Received {} bytes from {} in {:?}",
                        raw.len(),
                        session.endpoint(),
                        deadline.elapsed()
                    );
                }
                Ok(raw)
            }
            Err(e) => {
                if e.discards_session() {
                    tracing::warn!("Discarding session to {}: {}", session.endpoint(), e);
                    session.close();
                }
                Err(e)
            }
        }
    }
}
