//! TCP transport for the CTP device configuration protocol.
//!
//! Provisioning targets (WiFi modules in soft-AP mode) expose a plain TCP
//! port. This crate owns the socket side of things:
//! - resolving and connecting with a bounded connect timeout
//! - a listener for device-side tooling and tests
//!
//! This is the lowest layer of ctp. Everything else builds on top of
//! the [`CtpStream`] type provided here.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::CtpStream;
pub use tcp::{connect, TcpSocketListener, DEFAULT_DEVICE_PORT};
