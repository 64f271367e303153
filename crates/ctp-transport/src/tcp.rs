use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::CtpStream;

/// Port the provisioning service listens on in device soft-AP mode.
pub const DEFAULT_DEVICE_PORT: u16 = 3333;

/// Connect to a device (blocking), bounding each attempt by `timeout`.
///
/// Every address `host` resolves to is tried in order; the first successful
/// connection wins. If all attempts fail, the last error is reported.
pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<CtpStream> {
    if timeout.is_zero() {
        return Err(TransportError::InvalidTimeout(timeout));
    }

    let addr = format!("{host}:{port}");
    let candidates: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| TransportError::Resolve {
            addr: addr.clone(),
            source: e,
        })?
        .collect();

    if candidates.is_empty() {
        return Err(TransportError::Resolve {
            addr,
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "host resolved to no addresses",
            ),
        });
    }

    let mut last_err = None;
    for candidate in &candidates {
        match TcpStream::connect_timeout(candidate, timeout) {
            Ok(stream) => {
                debug!(%candidate, "connected to device");
                let stream = CtpStream::from_tcp(stream);
                // Request frames are small; don't let Nagle hold them back.
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(err) => {
                debug!(%candidate, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(TransportError::Connect {
        addr,
        source: last_err
            .unwrap_or_else(|| std::io::Error::other("no connection attempt was made")),
    })
}

/// TCP listener yielding [`CtpStream`]s.
///
/// Plays the device role: mock devices in the CLI and loopback tests.
pub struct TcpSocketListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpSocketListener {
    /// Bind and listen on `addr` (e.g. `0.0.0.0:3333`, `127.0.0.1:0`).
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self> {
        let display = addr.to_string();
        let listener = TcpListener::bind(&addr).map_err(|e| TransportError::Bind {
            addr: display.clone(),
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: display,
            source: e,
        })?;

        info!(%local_addr, "listening for ctp connections");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection.
    ///
    /// Blocks unless the listener is non-blocking, in which case an empty
    /// backlog is `TransportError::Accept` with `ErrorKind::WouldBlock`.
    /// Accepted streams are always blocking.
    pub fn accept(&self) -> Result<CtpStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        // Some platforms hand out sockets that inherit O_NONBLOCK.
        stream.set_nonblocking(false)?;
        debug!(%peer, "accepted connection");
        Ok(CtpStream::from_tcp(stream))
    }

    /// Switch `accept` between blocking and polling.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.listener
            .set_nonblocking(nonblocking)
            .map_err(Into::into)
    }

    /// The address this listener is bound to (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_bind_accept_connect() {
        let listener = TcpSocketListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().port();

        let handle = std::thread::spawn(move || {
            let mut client = connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();
            client.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_nonblocking_accept() {
        let listener = TcpSocketListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();

        let err = listener.accept().unwrap_err();
        assert!(
            matches!(&err, TransportError::Accept(e) if e.kind() == std::io::ErrorKind::WouldBlock)
        );

        let port = listener.local_addr().port();
        let mut client = connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();
        let mut server = loop {
            match listener.accept() {
                Ok(stream) => break stream,
                Err(TransportError::Accept(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => panic!("accept failed: {e}"),
            }
        };

        // The accepted stream must block rather than report WouldBlock.
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            client.write_all(b"late").unwrap();
        });
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"late");
        writer.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening on it.
        let port = {
            let probe = TcpSocketListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().port()
        };

        let result = connect("127.0.0.1", port, Duration::from_secs(2));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = connect("127.0.0.1", DEFAULT_DEVICE_PORT, Duration::ZERO);
        assert!(matches!(result, Err(TransportError::InvalidTimeout(_))));
    }

    #[test]
    fn test_unresolvable_host() {
        let result = connect("host.invalid.", DEFAULT_DEVICE_PORT, Duration::from_secs(1));
        assert!(matches!(result, Err(TransportError::Resolve { .. })));
    }

    #[test]
    fn test_stream_accessors() {
        let listener = TcpSocketListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();

        let handle = std::thread::spawn(move || listener.accept().unwrap());
        let client = connect("127.0.0.1", addr.port(), Duration::from_secs(2)).unwrap();
        let server = handle.join().unwrap();

        assert_eq!(client.peer_addr().unwrap(), addr);
        assert_eq!(server.peer_addr().unwrap(), client.local_addr().unwrap());
        assert!(format!("{client:?}").contains("tcp"));

        client.shutdown().unwrap();
        // Second shutdown on an already shut down socket must not fail.
        client.shutdown().unwrap();
    }
}
