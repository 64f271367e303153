//! Request/response sessions for CTP devices.
//!
//! This is the "just works" layer. Connect to a device, send a topic and
//! payload, and read back exactly one framed response under a deadline.
//! The [`command`] and [`provision`] modules add typed helpers for the
//! WiFi/MQTT provisioning exchange on top of the opaque payloads.

pub mod command;
pub mod connector;
pub mod error;
pub mod listener;
pub mod provision;
pub mod session;

pub use command::{DeviceCommand, StaSsidInfo, OP_NOTIFY, OP_PUT};
pub use connector::{connect, connect_with_config};
pub use error::{ProvisionError, Result, SessionError, SessionErrorKind};
pub use listener::SessionListener;
pub use provision::{provision_wifi, ProvisionOutcome};
pub use session::{Session, SessionConfig, SessionState};
