//! Well-known topics and wire limits.
//!
//! Topics are free-form UTF-8; only the ones the firmware documents are
//! listed here.

/// WiFi station credentials (and optional MQTT broker) push/notify.
pub const STA_SSID_INFO: &str = "STA_SSID_INFO";

/// Largest topic the 2-byte length field can carry.
pub const MAX_TOPIC_LEN: usize = u16::MAX as usize;

/// Largest payload the 4-byte length field can carry.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// Returns a display label for a topic.
pub fn topic_name(topic: &str) -> &str {
    if topic.is_empty() {
        "<empty>"
    } else {
        topic
    }
}

/// Returns true if the topic is one the firmware documents.
pub fn is_known(topic: &str) -> bool {
    matches!(topic, STA_SSID_INFO)
}
