use std::time::Duration;

use ctp_frame::{FrameError, FrameErrorKind};
use ctp_transport::TransportError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Connecting to the device failed (refused, unreachable, timed out).
    #[error("connection failed: {0}")]
    Connection(#[source] TransportError),

    /// A send or receive was attempted on a disconnected session.
    #[error("session is not connected")]
    NotConnected,

    /// The response did not arrive in full before the deadline.
    #[error("response timed out after {0:?}")]
    Timeout(Duration),

    /// Encoding or decoding failed (bad prefix, truncation, invalid UTF-8,
    /// oversized fields).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The encoded frame could not be written to the socket.
    #[error("send failed: {0}")]
    Send(#[source] FrameError),

    /// Listener-side transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Failure family of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    Connection,
    NotConnected,
    Timeout,
    Protocol,
    Decoding,
    Encoding,
    Send,
    Io,
}

impl SessionError {
    /// The failure family this error belongs to.
    pub fn kind(&self) -> SessionErrorKind {
        match self {
            SessionError::Connection(_) => SessionErrorKind::Connection,
            SessionError::NotConnected => SessionErrorKind::NotConnected,
            SessionError::Timeout(_) => SessionErrorKind::Timeout,
            SessionError::Frame(err) => match err.kind() {
                FrameErrorKind::Encoding => SessionErrorKind::Encoding,
                FrameErrorKind::Protocol => SessionErrorKind::Protocol,
                FrameErrorKind::Decoding => SessionErrorKind::Decoding,
                FrameErrorKind::Timeout => SessionErrorKind::Timeout,
                FrameErrorKind::Io => SessionErrorKind::Io,
            },
            SessionError::Send(_) => SessionErrorKind::Send,
            SessionError::Transport(_) => SessionErrorKind::Io,
        }
    }
}

/// Errors from the WiFi provisioning exchange.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Session-level failure while sending or receiving.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The command could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The device answered with an empty payload.
    #[error("device sent an empty response on {topic}")]
    EmptyResponse { topic: String },

    /// The device answered with something that is not a command object.
    #[error("device response is not valid json ({source}): {payload}")]
    InvalidResponse {
        payload: String,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;
