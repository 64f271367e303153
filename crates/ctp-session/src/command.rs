//! JSON command payloads understood by provisioning firmware.
//!
//! The framing layer treats payloads as opaque text; these types are a
//! convenience for the `{"op": ..., "param": {...}}` convention.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Command op: client writes a setting.
pub const OP_PUT: &str = "PUT";
/// Command op: device reports a setting or outcome.
pub const OP_NOTIFY: &str = "NOTIFY";

/// A device command or notification payload.
///
/// `P` is the `param` object; it defaults to untyped JSON for responses
/// whose shape is not known up front.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceCommand<P = serde_json::Value> {
    pub op: String,
    #[serde(default)]
    pub param: P,
    /// Status code some firmware adds to responses; 0 means success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errno: Option<i64>,
}

impl<P> DeviceCommand<P> {
    /// Create a PUT command.
    pub fn put(param: P) -> Self {
        Self {
            op: OP_PUT.to_string(),
            param,
            errno: None,
        }
    }

    /// Create a NOTIFY message.
    pub fn notify(param: P) -> Self {
        Self {
            op: OP_NOTIFY.to_string(),
            param,
            errno: None,
        }
    }

    /// Returns true for NOTIFY messages.
    pub fn is_notify(&self) -> bool {
        self.op == OP_NOTIFY
    }
}

impl<P: Serialize> DeviceCommand<P> {
    /// Serialize as compact JSON, the form firmware parsers expect.
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<P: DeserializeOwned + Default> DeviceCommand<P> {
    /// Parse a payload received from a device.
    pub fn from_payload(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

impl DeviceCommand<StaSsidInfo> {
    /// Create the PUT command carrying station credentials.
    pub fn put_sta_ssid_info(info: StaSsidInfo) -> Self {
        Self::put(info)
    }
}

impl DeviceCommand {
    /// String parameter by key, if present.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param.get(key).and_then(|v| v.as_str())
    }

    /// The `param.error` text a device attaches to a rejection.
    pub fn error_message(&self) -> Option<&str> {
        self.param_str("error")
    }
}

/// Station (client-mode) WiFi credentials, with an optional MQTT broker.
///
/// `status` is passed through verbatim; its meaning is firmware specific.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaSsidInfo {
    pub ssid: String,
    pub pwd: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_port: Option<String>,
}

impl StaSsidInfo {
    /// Credentials with `status` "1" and no broker.
    pub fn new(ssid: impl Into<String>, pwd: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            pwd: pwd.into(),
            status: "1".to_string(),
            mqtt_server: None,
            mqtt_port: None,
        }
    }

    /// Override the `status` field.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Point the device at an MQTT broker. Firmware expects the port as text.
    pub fn with_mqtt(mut self, server: impl Into<String>, port: u16) -> Self {
        self.mqtt_server = Some(server.into());
        self.mqtt_port = Some(port.to_string());
        self
    }
}

impl fmt::Debug for StaSsidInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaSsidInfo")
            .field("ssid", &self.ssid)
            .field("pwd", &format_args!("<redacted:{} bytes>", self.pwd.len()))
            .field("status", &self.status)
            .field("mqtt_server", &self.mqtt_server)
            .field("mqtt_port", &self.mqtt_port)
            .finish()
    }
}
