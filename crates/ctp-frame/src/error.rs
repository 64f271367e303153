use std::fmt;

/// A field of the CTP wire layout, named in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Prefix,
    TopicLength,
    Topic,
    PayloadLength,
    Payload,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Prefix => "prefix",
            Field::TopicLength => "topic length",
            Field::Topic => "topic",
            Field::PayloadLength => "payload length",
            Field::Payload => "payload",
        })
    }
}

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Topics identify the command; an empty one cannot be sent.
    #[error("topic must not be empty")]
    EmptyTopic,

    /// The topic does not fit the 2-byte length field.
    #[error("topic too long ({size} bytes, max {max})")]
    TopicTooLong { size: usize, max: usize },

    /// The payload does not fit the 4-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The stream did not start with `CTP:`.
    #[error("bad prefix (expected \"CTP:\", got {found:02x?} after {received} of 4 bytes)")]
    BadPrefix { found: Vec<u8>, received: usize },

    /// The stream ended before a field was complete.
    #[error("short read on {field} (expected {expected} bytes, got {received})")]
    ShortRead {
        field: Field,
        expected: usize,
        received: usize,
    },

    /// The topic or payload bytes are not valid UTF-8.
    #[error("invalid UTF-8 in {field}: {source}")]
    InvalidUtf8 {
        field: Field,
        source: std::str::Utf8Error,
    },

    /// The stream's read deadline expired mid-frame.
    #[error("timed out reading {field}")]
    Timeout { field: Field },

    /// The peer accepted zero bytes on write.
    #[error("connection closed (incomplete frame written)")]
    ConnectionClosed,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error class, one per failure family of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameErrorKind {
    /// Oversized or empty fields on send.
    Encoding,
    /// Bad prefix or truncated frame.
    Protocol,
    /// Invalid UTF-8 in a received field.
    Decoding,
    /// Read deadline exceeded.
    Timeout,
    /// Any other socket failure.
    Io,
}

impl FrameError {
    /// The class this error belongs to.
    pub fn kind(&self) -> FrameErrorKind {
        match self {
            FrameError::EmptyTopic
            | FrameError::TopicTooLong { .. }
            | FrameError::PayloadTooLarge { .. } => FrameErrorKind::Encoding,
            FrameError::BadPrefix { .. } | FrameError::ShortRead { .. } => {
                FrameErrorKind::Protocol
            }
            FrameError::InvalidUtf8 { .. } => FrameErrorKind::Decoding,
            FrameError::Timeout { .. } => FrameErrorKind::Timeout,
            FrameError::ConnectionClosed | FrameError::Io(_) => FrameErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
