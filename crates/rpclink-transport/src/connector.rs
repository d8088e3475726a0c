//! Opening sessions from configuration.

use rpclink_core::{Config, Request, Response, TransportKind};

use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::http::HttpSession;
use crate::serial::SerialSession;
use crate::session::Session;
use crate::tcp::TcpSession;

/// Builds the configured session and runs exchanges over it.
#[derive(Debug, Clone)]
pub struct Connector {
    config: Config,
    transport: TransportKind,
}

impl Connector {
    /// Create a connector using the config's default transport.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let transport = config.transport;
        Self { config, transport }
    }

    /// Override the transport.
    #[must_use]
    pub const fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Selected transport.
    #[must_use]
    pub const fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Exchange bounded by the configured timeout.
    #[must_use]
    pub const fn exchange(&self) -> Exchange {
        Exchange::new(self.config.timeout())
    }

    /// Open a fresh session on the selected transport.
    ///
    /// # Errors
    ///
    /// Returns a connection-class error if the endpoint cannot be reached.
    pub fn open(&self) -> Result<Box<dyn Session>, ExchangeError> {
        tracing::debug!("Opening {} session", self.transport);
        let session: Box<dyn Session> = match self.transport {
            TransportKind::Http => Box::new(HttpSession::new(self.config.http.url.clone())?),
            TransportKind::Tcp => Box::new(TcpSession::connect(
                &self.config.tcp.host,
                self.config.tcp.port,
                self.config.timeout(),
            )?),
            TransportKind::Serial => Box::new(SerialSession::open(
                &self.config.serial.path,
                self.config.serial.baud_rate,
            )?),
        };
        Ok(session)
    }

    /// Open a session, make one call, and close it.
    ///
    /// # Errors
    ///
    /// As for [`Connector::open`] and [`Exchange::call`].
    pub fn call_once(&self, request: &Request) -> Result<Response, ExchangeError> {
        let mut session = self.open()?;
        let result = self.exchange().call(&mut session, request);
        session.close();
        result
    }

    /// Open a session, send one notification, and close it.
    ///
    /// # Errors
    ///
    /// As for [`Connector::open`] and [`Exchange::notify`].
    pub fn notify_once(&self, request: &Request) -> Result<(), ExchangeError> {
        let mut session = self.open()?;
        let result = self.exchange().notify(&mut session, request);
        session.close();
        result
    }
}
