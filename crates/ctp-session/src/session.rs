use std::net::SocketAddr;
use std::time::Duration;

use ctp_frame::{FrameErrorKind, Message, MessageReader, MessageWriter};
use ctp_transport::CtpStream;
use tracing::debug;

use crate::error::{Result, SessionError};

/// Timeouts applied by a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on each TCP connect attempt. Default: 10 s.
    pub connect_timeout: Duration,
    /// Deadline for a complete response frame. Default: 5 s.
    pub response_timeout: Duration,
    /// Socket write timeout. Default: 10 s.
    pub write_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(5),
            write_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Connection state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

struct Connection {
    reader: MessageReader<CtpStream>,
    writer: MessageWriter<CtpStream>,
    peer: Option<SocketAddr>,
}

/// One request/response conversation with a device over one TCP connection.
///
/// At most one exchange is in flight: send a message, then receive its
/// response. A session is not shared between threads; open one per
/// connection instead. After any error the caller should `disconnect` and
/// reconnect, since the stream position is no longer known.
pub struct Session {
    config: SessionConfig,
    conn: Option<Connection>,
}

impl Session {
    /// Create a disconnected session.
    pub fn new(config: SessionConfig) -> Self {
        Self { config, conn: None }
    }

    /// Wrap an already connected stream (e.g. one accepted by a listener).
    pub fn from_stream(stream: CtpStream, config: SessionConfig) -> Result<Self> {
        let mut session = Self::new(config);
        session.attach(stream).map_err(SessionError::Transport)?;
        Ok(session)
    }

    /// Connect to `host:port`, replacing any existing connection.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.disconnect();

        let stream = ctp_transport::connect(host, port, self.config.connect_timeout)
            .map_err(SessionError::Connection)?;
        self.attach(stream).map_err(SessionError::Connection)?;
        Ok(())
    }

    fn attach(&mut self, stream: CtpStream) -> ctp_transport::Result<()> {
        stream.set_write_timeout(self.config.write_timeout)?;
        let reader_stream = stream.try_clone()?;
        let peer = stream.peer_addr().ok();

        debug!(?peer, "session connected");
        self.conn = Some(Connection {
            reader: MessageReader::new(reader_stream),
            writer: MessageWriter::new(stream),
            peer,
        });
        Ok(())
    }

    /// Current connection state.
    pub fn state(&self) -> SessionState {
        if self.conn.is_some() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    /// Returns true while a socket is held.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.conn.as_ref().and_then(|conn| conn.peer)
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Encode and write one message, returning once every byte is flushed.
    pub fn send_message(&mut self, topic: &str, payload: &str) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(SessionError::NotConnected)?;
        conn.writer.send(topic, payload).map_err(|err| match err.kind() {
            FrameErrorKind::Encoding => SessionError::Frame(err),
            _ => SessionError::Send(err),
        })
    }

    /// Read one complete response within the configured response timeout.
    pub fn receive_response(&mut self) -> Result<Message> {
        self.receive_response_within(self.config.response_timeout)
    }

    /// Read one complete response, prefix through payload, within `timeout`.
    pub fn receive_response_within(&mut self, timeout: Duration) -> Result<Message> {
        let conn = self.conn.as_mut().ok_or(SessionError::NotConnected)?;
        conn.reader
            .read_message_within(timeout)
            .map_err(|err| match err.kind() {
                FrameErrorKind::Timeout => SessionError::Timeout(timeout),
                _ => SessionError::Frame(err),
            })
    }

    /// Send one message and wait for its response.
    pub fn request(&mut self, topic: &str, payload: &str) -> Result<Message> {
        self.send_message(topic, payload)?;
        self.receive_response()
    }

    /// Release the socket. Safe to call repeatedly or when never connected.
    pub fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(err) = conn.writer.get_ref().shutdown() {
                debug!(error = %err, "shutdown on disconnect failed");
            }
            debug!(peer = ?conn.peer, "session disconnected");
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("peer", &self.peer_addr())
            .field("config", &self.config)
            .finish()
    }
}
