//! Response framing: deciding when a reply is complete.
//!
//! Each transport signals the end of a message differently. HTTP carries
//! its own framing, the raw TCP variant ends when the peer closes, and the
//! serial variant ends with a line followed by whatever is already buffered.

use std::fmt;
use std::io::{ErrorKind as IoErrorKind, Read};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use rpclink_core::validation::limits::{MAX_RESPONSE_BYTES, READ_CHUNK_BYTES};

use crate::error::{ExchangeError, is_timeout};

/// How a transport recognizes "response complete".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramingPolicy {
    /// The HTTP client demarcates the body.
    ContentLength,
    /// Read until a zero-length read signals the peer closed.
    ReadUntilClose,
    /// Wait for one non-blank newline-terminated line, then drain once.
    ///
    /// This is a heuristic, not a framing guarantee: a reply whose tail
    /// arrives after the drain is truncated and fails to parse.
    LineThenDrain,
}

impl FramingPolicy {
    /// Whether a session using this policy is spent after one exchange.
    #[must_use]
    pub const fn is_one_shot(self) -> bool {
        matches!(self, Self::ContentLength | Self::ReadUntilClose)
    }
}

impl fmt::Display for FramingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ContentLength => "content-length",
            Self::ReadUntilClose => "read-until-close",
            Self::LineThenDrain => "line-then-drain",
        };
        f.write_str(name)
    }
}

/// A point in time by which an exchange must finish.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Duration,
}

impl Deadline {
    /// Start a deadline `limit` from now.
    #[must_use]
    pub fn after(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    /// Configured bound.
    #[must_use]
    pub const fn limit(&self) -> Duration {
        self.limit
    }

    /// Time spent so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left, or `None` once expired.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.limit
            .checked_sub(self.elapsed())
            .filter(|left| !left.is_zero())
    }

    /// Time left, or a timeout error once expired.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeError::Timeout` when no time is left.
    pub fn check(&self) -> Result<Duration, ExchangeError> {
        self.remaining().ok_or_else(|| self.expired())
    }

    /// The timeout error for this deadline.
    #[must_use]
    pub fn expired(&self) -> ExchangeError {
        ExchangeError::Timeout {
            elapsed: self.elapsed(),
            limit: self.limit,
        }
    }
}

/// A byte source whose blocking reads can be bounded.
pub trait TimedRead: Read {
    /// Bound the next blocking read.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying handle rejects the timeout.
    fn set_read_bound(&mut self, timeout: Duration) -> std::io::Result<()>;
}

impl TimedRead for TcpStream {
    fn set_read_bound(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.set_read_timeout(Some(timeout))
    }
}

/// Read until the peer closes its side or the deadline passes.
///
/// # Errors
///
/// Returns `Timeout` if the peer keeps the stream open past the deadline,
/// `TooLarge` if the stream outgrows the response limit, and `Io` for any
/// other read failure.
pub fn read_until_close<R: TimedRead + ?Sized>(
    reader: &mut R,
    deadline: &Deadline,
) -> Result<Vec<u8>, ExchangeError> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_BYTES];

    loop {
        let remaining = deadline.check()?;
        reader.set_read_bound(remaining)?;

        match reader.read(&mut chunk) {
            Ok(0) => return Ok(buffer),
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_RESPONSE_BYTES {
                    return Err(ExchangeError::TooLarge {
                        limit: MAX_RESPONSE_BYTES,
                    });
                }
            }
            Err(e) if e.kind() == IoErrorKind::Interrupted => {}
            Err(e) if is_timeout(&e) => return Err(deadline.expired()),
            Err(e) => return Err(ExchangeError::Io(e)),
        }
    }
}

/// A serial-style link: bounded reads plus a count of buffered bytes.
pub trait LineLink: TimedRead {
    /// Bytes already received and waiting to be read.
    ///
    /// # Errors
    ///
    /// Returns error if the driver cannot report its input queue.
    fn bytes_available(&mut self) -> std::io::Result<usize>;
}

/// Wait for one non-blank line, then drain what is already buffered.
///
/// Blank lines and empty reads are discarded: some links emit spurious
/// blank reads while the connection settles. The drain is a single
/// non-blocking read of the bytes the link reports as available; the
/// concatenation of line and drain is the message.
///
/// # Errors
///
/// Returns `Timeout` if no complete line arrives before the deadline,
/// `TooLarge` past the response limit, and `Io` for other failures.
pub fn read_line_then_drain<L: LineLink + ?Sized>(
    link: &mut L,
    deadline: &Deadline,
) -> Result<Vec<u8>, ExchangeError> {
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_BYTES];

    loop {
        let blank = pending
            .iter()
            .position(|b| !matches!(b, b'\r' | b'\n'))
            .unwrap_or(pending.len());
        if blank > 0 {
            tracing::trace!("Discarding {blank} blank line bytes");
            pending.drain(..blank);
        }
        if pending.contains(&b'\n') {
            break;
        }

        let remaining = deadline.check()?;
        link.set_read_bound(remaining)?;

        match link.read(&mut chunk) {
            Ok(0) => tracing::trace!("Discarding empty read"),
            Ok(n) => {
                pending.extend_from_slice(&chunk[..n]);
                if pending.len() > MAX_RESPONSE_BYTES {
                    return Err(ExchangeError::TooLarge {
                        limit: MAX_RESPONSE_BYTES,
                    });
                }
            }
            Err(e) if e.kind() == IoErrorKind::Interrupted || is_timeout(&e) => {}
            Err(e) => return Err(ExchangeError::Io(e)),
        }
    }

    let available = link.bytes_available()?.min(MAX_RESPONSE_BYTES - pending.len());
    if available > 0 {
        let mut rest = vec![0u8; available];
        link.set_read_bound(DRAIN_BOUND)?;
        match link.read(&mut rest) {
            Ok(n) => pending.extend_from_slice(&rest[..n]),
            Err(e) if is_timeout(&e) => {}
            Err(e) => return Err(ExchangeError::Io(e)),
        }
    }

    Ok(pending)
}

/// Bound for the drain read; the bytes are already buffered.
const DRAIN_BOUND: Duration = Duration::from_millis(1);
