use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use ctp_transport::CtpStream;
use tracing::warn;

use crate::codec::{decode_message, Message};
use crate::error::{FrameError, Result};

/// Reads complete messages from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete messages.
/// Nothing is read ahead, so a failed decode never swallows bytes that
/// belong to the next frame beyond the field that failed.
pub struct MessageReader<T> {
    inner: T,
}

impl<T: Read> MessageReader<T> {
    /// Create a new message reader.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(FrameError::BadPrefix { received: 0, .. })` when the
    /// stream is already at EOF.
    pub fn read_message(&mut self) -> Result<Message> {
        decode_message(&mut self.inner)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl MessageReader<CtpStream> {
    /// Read the next message, failing if the whole frame has not arrived
    /// within `timeout`.
    ///
    /// The deadline covers prefix through payload: each underlying read is
    /// bounded by whatever time is left, not by a fresh `timeout`.
    pub fn read_message_within(&mut self, timeout: Duration) -> Result<Message> {
        // A timeout too large to represent as an instant means no deadline.
        let mut deadline = DeadlineReader {
            stream: &mut self.inner,
            deadline: Instant::now().checked_add(timeout),
        };
        let result = decode_message(&mut deadline);
        if let Err(FrameError::Timeout { field }) = &result {
            warn!(%field, ?timeout, "response deadline exceeded");
        }
        result
    }
}

/// Re-arms the socket read timeout with the time remaining before each read.
struct DeadlineReader<'a> {
    stream: &'a mut CtpStream,
    deadline: Option<Instant>,
}

impl Read for DeadlineReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let timeout = match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(std::io::Error::from(ErrorKind::TimedOut));
                }
                Some(remaining)
            }
            None => None,
        };
        self.stream
            .set_read_timeout(timeout)
            .map_err(|err| std::io::Error::other(err.to_string()))?;
        self.stream.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::net::TcpListener;

    use super::*;
    use crate::codec::encode_to_vec;
    use crate::error::{Field, FrameErrorKind};

    fn loopback_pair() -> (CtpStream, std::net::TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = ctp_transport::connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn read_single_message() {
        let wire = encode_to_vec("STA_SSID_INFO", "{}").unwrap();

        let mut reader = MessageReader::new(Cursor::new(wire));
        let message = reader.read_message().unwrap();

        assert_eq!(message.topic, "STA_SSID_INFO");
        assert_eq!(message.payload, "{}");
    }

    #[test]
    fn read_multiple_messages() {
        let mut wire = encode_to_vec("one", "1").unwrap();
        wire.extend(encode_to_vec("two", "22").unwrap());
        wire.extend(encode_to_vec("three", "").unwrap());

        let mut reader = MessageReader::new(Cursor::new(wire));

        assert_eq!(reader.read_message().unwrap(), Message::new("one", "1"));
        assert_eq!(reader.read_message().unwrap(), Message::new("two", "22"));
        assert_eq!(reader.read_message().unwrap(), Message::new("three", ""));
    }

    #[test]
    fn read_message_with_large_payload() {
        let payload = "A".repeat(64 * 1024 + 7);
        let wire = encode_to_vec("bulk", &payload).unwrap();

        let mut reader = MessageReader::new(Cursor::new(wire));
        let message = reader.read_message().unwrap();

        assert_eq!(message.payload.len(), payload.len());
        assert_eq!(message.payload, payload);
    }

    #[test]
    fn partial_read_handling() {
        let wire = encode_to_vec("slow", r#"{"op":"NOTIFY"}"#).unwrap();

        let byte_reader = ByteByByteReader {
            bytes: wire,
            pos: 0,
        };
        let mut reader = MessageReader::new(byte_reader);

        let message = reader.read_message().unwrap();
        assert_eq!(message.topic, "slow");
        assert_eq!(message.payload, r#"{"op":"NOTIFY"}"#);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = MessageReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::BadPrefix { received: 0, .. }));
    }

    #[test]
    fn connection_closed_mid_message() {
        let wire = encode_to_vec("topic", "only-part-of-this").unwrap();
        let cut = wire.len() - 5;

        let mut reader = MessageReader::new(ByteByByteReader {
            bytes: wire[..cut].to_vec(),
            pos: 0,
        });
        let err = reader.read_message().unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortRead {
                field: Field::Payload,
                ..
            }
        ));
    }

    #[test]
    fn bad_prefix_consumes_only_prefix() {
        let mut bytes = b"XXXX".to_vec();
        bytes.extend(encode_to_vec("next", "frame").unwrap());

        let mut reader = MessageReader::new(Cursor::new(bytes));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::BadPrefix { received: 4, .. }));
        assert_eq!(reader.get_ref().position(), 4);

        // The following frame is still intact.
        assert_eq!(
            reader.read_message().unwrap(),
            Message::new("next", "frame")
        );
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = MessageReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_is_timeout() {
        let wire = encode_to_vec("t", "ok").unwrap();

        let reader = FailThenData {
            kind: ErrorKind::WouldBlock,
            failed: false,
            bytes: wire,
            pos: 0,
        };
        let mut framed = MessageReader::new(reader);
        let err = framed.read_message().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Timeout {
                field: Field::Prefix
            }
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let wire = encode_to_vec("t", "ok").unwrap();

        let reader = FailThenData {
            kind: ErrorKind::Interrupted,
            failed: false,
            bytes: wire,
            pos: 0,
        };
        let mut framed = MessageReader::new(reader);
        let message = framed.read_message().unwrap();

        assert_eq!(message, Message::new("t", "ok"));
    }

    #[test]
    fn other_io_errors_propagate() {
        let reader = FailThenData {
            kind: ErrorKind::ConnectionReset,
            failed: false,
            bytes: Vec::new(),
            pos: 0,
        };
        let err = MessageReader::new(reader).read_message().unwrap_err();
        assert!(matches!(&err, FrameError::Io(e) if e.kind() == ErrorKind::ConnectionReset));
        assert_eq!(err.kind(), FrameErrorKind::Io);
    }

    #[test]
    fn read_within_over_tcp() {
        let (client, mut server) = loopback_pair();
        server
            .write_all(&encode_to_vec("STA_SSID_INFO", r#"{"op":"NOTIFY"}"#).unwrap())
            .unwrap();

        let mut reader = MessageReader::new(client);
        let message = reader.read_message_within(Duration::from_secs(2)).unwrap();
        assert_eq!(message.topic, "STA_SSID_INFO");
        assert_eq!(message.payload, r#"{"op":"NOTIFY"}"#);
    }

    #[test]
    fn unrepresentable_deadline_reads_without_limit() {
        let (client, mut server) = loopback_pair();
        server
            .write_all(&encode_to_vec("STA_SSID_INFO", "{}").unwrap())
            .unwrap();

        let mut reader = MessageReader::new(client);
        let message = reader.read_message_within(Duration::MAX).unwrap();
        assert_eq!(message, Message::new("STA_SSID_INFO", "{}"));
    }

    #[test]
    fn read_within_times_out_on_silent_peer() {
        let (client, _server) = loopback_pair();

        let mut reader = MessageReader::new(client);
        let started = Instant::now();
        let err = reader
            .read_message_within(Duration::from_millis(100))
            .unwrap_err();

        assert!(matches!(
            err,
            FrameError::Timeout {
                field: Field::Prefix
            }
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn deadline_spans_whole_frame() {
        let (client, mut server) = loopback_pair();

        // Dribble the frame so that each field arrives within 80ms of the
        // previous one, but the whole frame takes far longer than the deadline.
        let writer = std::thread::spawn(move || {
            let wire = encode_to_vec("drip", "0123456789").unwrap();
            for byte in wire {
                if server.write_all(&[byte]).is_err() {
                    return;
                }
                std::thread::sleep(Duration::from_millis(80));
            }
        });

        let mut reader = MessageReader::new(client);
        let started = Instant::now();
        let err = reader
            .read_message_within(Duration::from_millis(300))
            .unwrap_err();

        assert_eq!(err.kind(), FrameErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_millis(1_000));

        drop(reader);
        writer.join().unwrap();
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct FailThenData {
        kind: ErrorKind,
        failed: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for FailThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
