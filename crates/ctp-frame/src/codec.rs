use std::io::{ErrorKind, Read};

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::error::{Field, FrameError, Result};
use crate::topic::{MAX_PAYLOAD_LEN, MAX_TOPIC_LEN};

/// Prefix bytes: "CTP:" (0x43 0x54 0x50 0x3A).
pub const PREFIX: [u8; 4] = *b"CTP:";

const TOPIC_LEN_SIZE: usize = 2;
const PAYLOAD_LEN_SIZE: usize = 4;

/// Fixed framing overhead: prefix (4) + topic length (2) + payload length (4).
pub const OVERHEAD: usize = PREFIX.len() + TOPIC_LEN_SIZE + PAYLOAD_LEN_SIZE;

// Variable-length fields are read in bounded chunks so a hostile length
// header cannot force a huge allocation before any payload arrives.
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// A decoded CTP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Command or notification type, e.g. `STA_SSID_INFO`.
    pub topic: String,
    /// Opaque UTF-8 body, conventionally compact JSON.
    pub payload: String,
}

impl Message {
    /// Create a new message.
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// The total wire size of this message (overhead + topic + payload).
    pub fn wire_size(&self) -> usize {
        OVERHEAD + self.topic.len() + self.payload.len()
    }
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬───────────┬─────────┬─────────────┬───────────┐
/// │ Prefix(4B) │ TopicLen  │ Topic   │ PayloadLen  │ Payload   │
/// │ "CTP:"     │ (2B LE)   │ (UTF-8) │ (4B LE)     │ (UTF-8)   │
/// └────────────┴───────────┴─────────┴─────────────┴───────────┘
/// ```
pub fn encode_message(topic: &str, payload: &str, dst: &mut BytesMut) -> Result<()> {
    if topic.is_empty() {
        return Err(FrameError::EmptyTopic);
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(FrameError::TopicTooLong {
            size: topic.len(),
            max: MAX_TOPIC_LEN,
        });
    }
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    dst.reserve(OVERHEAD + topic.len() + payload.len());
    dst.put_slice(&PREFIX);
    dst.put_u16_le(topic.len() as u16);
    dst.put_slice(topic.as_bytes());
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload.as_bytes());

    trace!(topic, payload_len = payload.len(), "encoded ctp message");
    Ok(())
}

/// Encode a message into a freshly allocated buffer.
pub fn encode_to_vec(topic: &str, payload: &str) -> Result<Vec<u8>> {
    let mut buf = BytesMut::new();
    encode_message(topic, payload, &mut buf)?;
    Ok(buf.to_vec())
}

/// Decode one message from a byte stream (blocking).
///
/// Reads exactly the bytes the frame declares and nothing more, so the
/// stream is left positioned at the next frame. A read returning fewer bytes
/// than requested is retried; only end-of-stream before a field is complete
/// is an error.
pub fn decode_message<R: Read + ?Sized>(src: &mut R) -> Result<Message> {
    let mut prefix = [0u8; 4];
    let received = fill(src, &mut prefix, Field::Prefix)?;
    if received < prefix.len() || prefix != PREFIX {
        return Err(FrameError::BadPrefix {
            found: prefix[..received].to_vec(),
            received,
        });
    }

    let mut topic_len = [0u8; TOPIC_LEN_SIZE];
    read_exact(src, &mut topic_len, Field::TopicLength)?;
    let topic_len = u16::from_le_bytes(topic_len) as usize;

    let topic = read_text(src, topic_len, Field::Topic)?;

    let mut payload_len = [0u8; PAYLOAD_LEN_SIZE];
    read_exact(src, &mut payload_len, Field::PayloadLength)?;
    let payload_len = u32::from_le_bytes(payload_len) as usize;

    let payload = if payload_len == 0 {
        String::new()
    } else {
        read_text(src, payload_len, Field::Payload)?
    };

    trace!(%topic, payload_len, "decoded ctp message");
    Ok(Message { topic, payload })
}

fn read_exact<R: Read + ?Sized>(src: &mut R, dst: &mut [u8], field: Field) -> Result<()> {
    let received = fill(src, dst, field)?;
    if received < dst.len() {
        return Err(FrameError::ShortRead {
            field,
            expected: dst.len(),
            received,
        });
    }
    Ok(())
}

fn read_text<R: Read + ?Sized>(src: &mut R, len: usize, field: Field) -> Result<String> {
    let mut buf = Vec::with_capacity(len.min(READ_CHUNK_SIZE));
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    while buf.len() < len {
        let want = (len - buf.len()).min(READ_CHUNK_SIZE);
        let received = fill(src, &mut chunk[..want], field)?;
        buf.extend_from_slice(&chunk[..received]);
        if received < want {
            return Err(FrameError::ShortRead {
                field,
                expected: len,
                received: buf.len(),
            });
        }
    }

    String::from_utf8(buf).map_err(|err| FrameError::InvalidUtf8 {
        field,
        source: err.utf8_error(),
    })
}

/// Read until `dst` is full or the stream reports EOF; returns bytes read.
fn fill<R: Read + ?Sized>(src: &mut R, dst: &mut [u8], field: Field) -> Result<usize> {
    let mut filled = 0usize;
    while filled < dst.len() {
        match src.read(&mut dst[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                return Err(FrameError::Timeout { field });
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(filled)
}
