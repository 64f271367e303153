use std::io::ErrorKind;
use std::net::SocketAddr;

use ctp_transport::{TcpSocketListener, TransportError};

use crate::error::Result;
use crate::session::{Session, SessionConfig};

/// Accepts client connections and hands each one out as a [`Session`].
///
/// This is the device side of the exchange: mock devices and tests use it to
/// receive requests and answer them with the same framing.
pub struct SessionListener {
    socket: TcpSocketListener,
    config: SessionConfig,
}

impl SessionListener {
    /// Bind to a TCP address such as `0.0.0.0:3333`.
    pub fn bind(addr: &str) -> Result<Self> {
        let socket = TcpSocketListener::bind(addr)?;
        Ok(Self {
            socket,
            config: SessionConfig::default(),
        })
    }

    /// Override the configuration given to accepted sessions.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Accept the next connection (blocking).
    pub fn accept(&self) -> Result<Session> {
        self.socket.set_nonblocking(false)?;
        let stream = self.socket.accept()?;
        Session::from_stream(stream, self.config.clone())
    }

    /// Accept a pending connection without waiting.
    ///
    /// Puts the listener in non-blocking mode; returns `None` when no client
    /// is waiting.
    pub fn try_accept(&self) -> Result<Option<Session>> {
        self.socket.set_nonblocking(true)?;
        match self.socket.accept() {
            Ok(stream) => Session::from_stream(stream, self.config.clone()).map(Some),
            Err(TransportError::Accept(err)) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// The bound address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr()
    }
}

impl std::fmt::Debug for SessionListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionListener")
            .field("local_addr", &self.local_addr())
            .field("config", &self.config)
            .finish()
    }
}
