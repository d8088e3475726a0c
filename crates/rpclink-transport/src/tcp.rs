//! Raw TCP session: one connection per exchange, reply ends at peer close.

use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{ExchangeError, is_timeout};
use crate::framing::{Deadline, FramingPolicy, read_until_close};
use crate::session::Session;

/// A connected TCP stream to the device.
///
/// Spent once a reply has been read: the peer signals the end of the reply
/// by closing the connection.
#[derive(Debug)]
pub struct TcpSession {
    endpoint: String,
    stream: Option<TcpStream>,
}

impl TcpSession {
    /// Connect to `host:port`, trying each resolved address in turn.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeError::Connect` if name resolution fails or no
    /// address accepts the connection within `timeout`.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, ExchangeError> {
        let endpoint = format!("{host}:{port}");
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| ExchangeError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    tracing::debug!("Connected to {} ({})", endpoint, addr);
                    return Ok(Self::from_stream(endpoint, stream));
                }
                Err(e) => {
                    tracing::debug!("Connection attempt to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(ExchangeError::Connect {
            endpoint,
            source: last_error.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
            }),
        })
    }

    /// Wrap an already-connected stream.
    #[must_use]
    pub fn from_stream(endpoint: impl Into<String>, stream: TcpStream) -> Self {
        Self {
            endpoint: endpoint.into(),
            stream: Some(stream),
        }
    }

    fn stream(&mut self) -> Result<&mut TcpStream, ExchangeError> {
        let endpoint = &self.endpoint;
        self.stream.as_mut().ok_or_else(|| ExchangeError::Unusable {
            endpoint: endpoint.clone(),
        })
    }
}

impl Session for TcpSession {
    fn policy(&self) -> FramingPolicy {
        FramingPolicy::ReadUntilClose
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn is_usable(&self) -> bool {
        self.stream.is_some()
    }

    fn send(&mut self, payload: &[u8], deadline: &Deadline) -> Result<(), ExchangeError> {
        let remaining = deadline.check()?;
        let stream = self.stream()?;
        stream.set_write_timeout(Some(remaining))?;

        let written = stream.write_all(payload).and_then(|()| stream.flush());
        written.map_err(|e| {
            if is_timeout(&e) {
                deadline.expired()
            } else {
                ExchangeError::Io(e)
            }
        })
    }

    fn receive(&mut self, deadline: &Deadline) -> Result<Vec<u8>, ExchangeError> {
        let bytes = read_until_close(self.stream()?, deadline)?;
        // Peer closed; nothing more can travel on this connection.
        self.stream = None;
        Ok(bytes)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
