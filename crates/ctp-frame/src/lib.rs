//! Topic-addressed, length-prefixed message framing for CTP.
//!
//! This is the core of ctp. Every message is framed as:
//! - The 4-byte ASCII prefix `CTP:`
//! - A 2-byte little-endian topic length, then the UTF-8 topic
//! - A 4-byte little-endian payload length, then the UTF-8 payload
//!
//! Readers accumulate partial reads until each field is complete.

pub mod codec;
pub mod error;
pub mod reader;
pub mod topic;
pub mod writer;

pub use codec::{decode_message, encode_message, encode_to_vec, Message, PREFIX};
pub use error::{Field, FrameError, FrameErrorKind, Result};
pub use reader::MessageReader;
pub use topic::{is_known, topic_name, MAX_PAYLOAD_LEN, MAX_TOPIC_LEN, STA_SSID_INFO};
pub use writer::MessageWriter;
