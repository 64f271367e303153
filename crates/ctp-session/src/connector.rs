use crate::error::Result;
use crate::session::{Session, SessionConfig};

/// Connect to a device with default timeouts.
pub fn connect(host: &str, port: u16) -> Result<Session> {
    connect_with_config(host, port, SessionConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(host: &str, port: u16, config: SessionConfig) -> Result<Session> {
    let mut session = Session::new(config);
    session.connect(host, port)?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use ctp_frame::STA_SSID_INFO;

    use super::*;
    use crate::listener::SessionListener;

    #[test]
    fn connect_convenience() {
        let listener = SessionListener::bind("127.0.0.1:0").expect("listener should bind");
        let port = listener.local_addr().port();

        let device = thread::spawn(move || {
            let mut session = listener.accept().expect("listener should accept");
            let message = session
                .receive_response()
                .expect("should receive request");
            session
                .send_message(&message.topic, &message.payload)
                .expect("should echo request");
        });

        let mut client = connect("127.0.0.1", port).expect("client should connect");
        let response = client
            .request(STA_SSID_INFO, "hello")
            .expect("request should succeed");
        assert_eq!(response.topic, STA_SSID_INFO);
        assert_eq!(response.payload, "hello");

        device.join().expect("device thread should complete");
    }

    #[test]
    fn connect_with_config_applies_timeouts() {
        let listener = SessionListener::bind("127.0.0.1:0").expect("listener should bind");
        let port = listener.local_addr().port();

        let config = SessionConfig {
            response_timeout: Duration::from_millis(250),
            ..SessionConfig::default()
        };
        let session = connect_with_config("127.0.0.1", port, config).expect("should connect");
        assert_eq!(session.config().response_timeout, Duration::from_millis(250));
        assert!(session.is_connected());
    }
}
