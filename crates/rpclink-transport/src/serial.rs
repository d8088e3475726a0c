//! Serial session: newline-terminated requests over a long-lived port.

use std::io::Write;
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

use crate::error::{ExchangeError, is_timeout};
use crate::framing::{Deadline, FramingPolicy, LineLink, TimedRead, read_line_then_drain};
use crate::session::Session;

/// Default line speed of the device.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Per-read bound used until an exchange sets its own.
const IDLE_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A serial port as seen by the exchange.
pub trait SerialLink: LineLink + Write + Send {
    /// Drop bytes received before the request was written.
    ///
    /// # Errors
    ///
    /// Returns error if the driver cannot clear its input queue.
    fn discard_input(&mut self) -> std::io::Result<()>;

    /// Bound the next blocking write.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying handle rejects the timeout.
    fn set_write_bound(&mut self, timeout: Duration) -> std::io::Result<()>;
}

impl TimedRead for Box<dyn SerialPort> {
    fn set_read_bound(&mut self, timeout: Duration) -> std::io::Result<()> {
        SerialPort::set_timeout(&mut **self, timeout).map_err(std::io::Error::from)
    }
}

impl LineLink for Box<dyn SerialPort> {
    fn bytes_available(&mut self) -> std::io::Result<usize> {
        let queued = self.bytes_to_read().map_err(std::io::Error::from)?;
        Ok(usize::try_from(queued).unwrap_or(usize::MAX))
    }
}

impl SerialLink for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> std::io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(std::io::Error::from)
    }

    // One timeout covers reads and writes, and the drain leaves it tiny.
    fn set_write_bound(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.set_read_bound(timeout)
    }
}

/// A serial port held open across exchanges.
///
/// Ports are costly to reopen (many boards reset on open), so one session
/// serves every call until it is closed or a failure discards it.
pub struct SerialSession<L: SerialLink = Box<dyn SerialPort>> {
    endpoint: String,
    link: Option<L>,
}

impl SerialSession {
    /// Open a serial device.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeError::Open` if the port cannot be opened.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, ExchangeError> {
        let port = serialport::new(path, baud_rate)
            .timeout(IDLE_READ_TIMEOUT)
            .open()
            .map_err(|e| ExchangeError::Open {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Self::with_link(path, port))
    }
}

impl<L: SerialLink> SerialSession<L> {
    /// Wrap an already-open link.
    #[must_use]
    pub fn with_link(endpoint: impl Into<String>, link: L) -> Self {
        Self {
            endpoint: endpoint.into(),
            link: Some(link),
        }
    }

    /// The underlying link, if still open.
    #[must_use]
    pub const fn link(&self) -> Option<&L> {
        self.link.as_ref()
    }

    fn link_mut(&mut self) -> Result<&mut L, ExchangeError> {
        let endpoint = &self.endpoint;
        self.link.as_mut().ok_or_else(|| ExchangeError::Unusable {
            endpoint: endpoint.clone(),
        })
    }
}

fn write_line<W: Write + ?Sized>(link: &mut W, payload: &[u8]) -> std::io::Result<()> {
    link.write_all(payload)?;
    link.write_all(b"\n")?;
    link.flush()
}

impl<L: SerialLink> std::fmt::Debug for SerialSession<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("endpoint", &self.endpoint)
            .field("open", &self.link.is_some())
            .finish()
    }
}

impl<L: SerialLink> Session for SerialSession<L> {
    fn policy(&self) -> FramingPolicy {
        FramingPolicy::LineThenDrain
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn is_usable(&self) -> bool {
        self.link.is_some()
    }

    fn send(&mut self, payload: &[u8], deadline: &Deadline) -> Result<(), ExchangeError> {
        let remaining = deadline.check()?;
        let link = self.link_mut()?;
        link.discard_input()?;
        link.set_write_bound(remaining)?;

        write_line(link, payload).map_err(|e| {
            if is_timeout(&e) {
                deadline.expired()
            } else {
                ExchangeError::Io(e)
            }
        })
    }

    fn receive(&mut self, deadline: &Deadline) -> Result<Vec<u8>, ExchangeError> {
        read_line_then_drain(self.link_mut()?, deadline)
    }

    fn close(&mut self) {
        if self.link.take().is_some() {
            tracing::debug!("Closed serial port {}", self.endpoint);
        }
    }
}
