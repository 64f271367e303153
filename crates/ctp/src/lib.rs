//! CTP: the length-prefixed, topic-addressed protocol used to push WiFi
//! credentials (and an optional MQTT broker) to embedded devices over TCP.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connect-with-timeout and listener
//! - [`frame`]: `CTP:` message framing (topic + payload)
//! - [`session`]: Request/response sessions and provisioning helpers
//!   (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use ctp_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ctp_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use ctp_session::*;
}
