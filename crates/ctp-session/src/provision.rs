//! The STA_SSID_INFO exchange: push WiFi credentials, read the verdict.

use ctp_frame::STA_SSID_INFO;
use tracing::{info, warn};

use crate::command::{DeviceCommand, StaSsidInfo};
use crate::error::ProvisionError;
use crate::session::Session;

/// How the device answered a provisioning request.
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionOutcome {
    /// The device took the credentials.
    Accepted { response: DeviceCommand },
    /// The device refused them; `error` is its `param.error` text.
    Rejected {
        error: String,
        response: DeviceCommand,
    },
}

impl ProvisionOutcome {
    /// Classify a parsed device response.
    ///
    /// Firmware reports success either with `errno: 0` or, when it omits
    /// `errno`, by echoing the settings back as a NOTIFY.
    pub fn from_response(response: DeviceCommand) -> Self {
        let accepted = match response.errno {
            Some(errno) => errno == 0,
            None => response.is_notify(),
        };
        if accepted {
            Self::Accepted { response }
        } else {
            let error = response
                .error_message()
                .unwrap_or("Unknown error")
                .to_string();
            Self::Rejected { error, response }
        }
    }

    /// Returns true if the device accepted the credentials.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The parsed device response.
    pub fn response(&self) -> &DeviceCommand {
        match self {
            Self::Accepted { response } | Self::Rejected { response, .. } => response,
        }
    }
}

/// Send station credentials and wait for the device's verdict.
///
/// Uses the session's configured response timeout.
pub fn provision_wifi(
    session: &mut Session,
    info: &StaSsidInfo,
) -> Result<ProvisionOutcome, ProvisionError> {
    let payload = DeviceCommand::put_sta_ssid_info(info.clone()).to_payload()?;
    info!(ssid = %info.ssid, mqtt = info.mqtt_server.is_some(), "sending STA_SSID_INFO");

    let reply = session.request(STA_SSID_INFO, &payload)?;
    if reply.topic != STA_SSID_INFO {
        warn!(topic = %reply.topic, "device answered on an unexpected topic");
    }
    if reply.payload.is_empty() {
        return Err(ProvisionError::EmptyResponse { topic: reply.topic });
    }

    let response = DeviceCommand::from_payload(&reply.payload).map_err(|source| {
        ProvisionError::InvalidResponse {
            payload: reply.payload.clone(),
            source,
        }
    })?;

    let outcome = ProvisionOutcome::from_response(response);
    match &outcome {
        ProvisionOutcome::Accepted { .. } => info!("device accepted wifi configuration"),
        ProvisionOutcome::Rejected { error, .. } => {
            warn!(%error, "device rejected wifi configuration")
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::error::SessionErrorKind;
    use crate::listener::SessionListener;
    use crate::session::SessionConfig;

    fn mock_device(reply: &'static str) -> (u16, thread::JoinHandle<String>) {
        let listener = SessionListener::bind("127.0.0.1:0").expect("listener should bind");
        let port = listener.local_addr().port();
        let handle = thread::spawn(move || {
            let mut session = listener.accept().expect("should accept");
            let request = session.receive_response().expect("should get request");
            assert_eq!(request.topic, STA_SSID_INFO);
            session
                .send_message(STA_SSID_INFO, reply)
                .expect("should reply");
            request.payload
        });
        (port, handle)
    }

    fn client(port: u16) -> Session {
        let config = SessionConfig {
            response_timeout: Duration::from_secs(2),
            ..SessionConfig::default()
        };
        crate::connector::connect_with_config("127.0.0.1", port, config)
            .expect("should connect")
    }

    #[test]
    fn notify_echo_is_accepted() {
        let (port, device) = mock_device(
            r#"{"op":"NOTIFY","param":{"ssid":"TJxu","status":"1","mqtt_server":"broker.emqx.io","mqtt_port":"1883"}}"#,
        );
        let mut session = client(port);

        let info = StaSsidInfo::new("TJxu", "pw").with_mqtt("broker.emqx.io", 1883);
        let outcome = provision_wifi(&mut session, &info).unwrap();

        assert!(outcome.is_accepted());
        assert_eq!(
            outcome.response().param_str("mqtt_server"),
            Some("broker.emqx.io")
        );

        let sent = device.join().unwrap();
        assert_eq!(
            sent,
            r#"{"op":"PUT","param":{"ssid":"TJxu","pwd":"pw","status":"1","mqtt_server":"broker.emqx.io","mqtt_port":"1883"}}"#
        );
    }

    #[test]
    fn errno_rejection_carries_device_error() {
        let (port, device) =
            mock_device(r#"{"op":"PUT","errno":1,"param":{"error":"ssid not found"}}"#);
        let mut session = client(port);

        let outcome = provision_wifi(&mut session, &StaSsidInfo::new("x", "y")).unwrap();
        assert_eq!(
            outcome,
            ProvisionOutcome::Rejected {
                error: "ssid not found".to_string(),
                response: DeviceCommand {
                    op: "PUT".to_string(),
                    param: json!({ "error": "ssid not found" }),
                    errno: Some(1),
                },
            }
        );
        device.join().unwrap();
    }

    #[test]
    fn empty_reply_is_an_error() {
        let (port, device) = mock_device("");
        let mut session = client(port);

        let err = provision_wifi(&mut session, &StaSsidInfo::new("x", "y")).unwrap_err();
        assert!(matches!(err, ProvisionError::EmptyResponse { .. }));
        device.join().unwrap();
    }

    #[test]
    fn non_json_reply_keeps_raw_text() {
        let (port, device) = mock_device("OK");
        let mut session = client(port);

        let err = provision_wifi(&mut session, &StaSsidInfo::new("x", "y")).unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidResponse { ref payload, .. } if payload == "OK"));
        device.join().unwrap();
    }

    #[test]
    fn disconnected_session_fails_fast() {
        let mut session = Session::default();
        let err = provision_wifi(&mut session, &StaSsidInfo::new("x", "y")).unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Session(ref e) if e.kind() == SessionErrorKind::NotConnected
        ));
    }

    #[test]
    fn classification_rules() {
        let ok = DeviceCommand {
            op: "PUT".to_string(),
            param: json!({}),
            errno: Some(0),
        };
        assert!(ProvisionOutcome::from_response(ok).is_accepted());

        let notify_with_errno = DeviceCommand {
            op: "NOTIFY".to_string(),
            param: json!({}),
            errno: Some(2),
        };
        assert!(!ProvisionOutcome::from_response(notify_with_errno).is_accepted());

        let bare_put = DeviceCommand::put(json!({}));
        match ProvisionOutcome::from_response(bare_put) {
            ProvisionOutcome::Rejected { error, .. } => assert_eq!(error, "Unknown error"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
