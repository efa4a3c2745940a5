//! UDP connection to the display wall.
//!
//! Datagrams are fire-and-forget: there is no acknowledgement, and a
//! send that the OS rejects or truncates is reported as
//! [`LedwandError::Send`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use tracing::debug;

use crate::error::LedwandError;

/// UDP port the display wall listens on.
pub const DEFAULT_PORT: u16 = 2342;

/// Anything that can emit one datagram per call.
pub trait Transport {
    /// Transmit `datagram` as a single message.
    fn send(&mut self, datagram: &[u8]) -> Result<(), LedwandError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, datagram: &[u8]) -> Result<(), LedwandError> {
        (**self).send(datagram)
    }
}

/// A connectionless endpoint targeting one display.
///
/// Constructed once at start-up and owned by the display session.
#[derive(Debug)]
pub struct Connection {
    socket: UdpSocket,
    remote_addr: SocketAddr,
    datagrams_sent: u64,
    bytes_sent: u64,
}

impl Connection {
    /// Resolve a literal IP `address` and bind a local datagram socket.
    pub fn open(address: &str, port: u16) -> Result<Self, LedwandError> {
        let ip: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| LedwandError::Address(address.to_string()))?;
        let remote_addr = SocketAddr::new(ip, port);

        let local: IpAddr = match ip {
            IpAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
            IpAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
        };
        let socket = UdpSocket::bind(SocketAddr::new(local, 0)).map_err(LedwandError::Socket)?;
        debug!(
            "display connection {} -> {remote_addr}",
            socket.local_addr().map_err(LedwandError::Socket)?
        );

        Ok(Self {
            socket,
            remote_addr,
            datagrams_sent: 0,
            bytes_sent: 0,
        })
    }

    /// The display address this connection targets.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Local address of the underlying socket.
    pub fn local_addr(&self) -> Result<SocketAddr, LedwandError> {
        self.socket.local_addr().map_err(LedwandError::Socket)
    }

    /// Datagrams fully accepted since construction.
    pub fn datagrams_sent(&self) -> u64 {
        self.datagrams_sent
    }

    /// Total bytes sent since construction.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}

impl Transport for Connection {
    fn send(&mut self, datagram: &[u8]) -> Result<(), LedwandError> {
        match self.socket.send_to(datagram, self.remote_addr) {
            Ok(sent) if sent == datagram.len() => {
                self.datagrams_sent += 1;
                self.bytes_sent += sent as u64;
                Ok(())
            }
            Ok(sent) => Err(LedwandError::Send {
                sent,
                expected: datagram.len(),
                source: None,
            }),
            Err(e) => Err(LedwandError::Send {
                sent: 0,
                expected: datagram.len(),
                source: Some(e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn malformed_address_is_rejected() {
        for bad in ["", "ledwand", "172.23.42", "300.1.1.1"] {
            assert!(matches!(
                Connection::open(bad, DEFAULT_PORT),
                Err(LedwandError::Address(_))
            ));
        }
    }

    #[test]
    fn hostnames_are_not_resolved() {
        assert!(Connection::open("localhost", DEFAULT_PORT).is_err());
    }

    #[test]
    fn send_emits_one_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut conn = Connection::open("127.0.0.1", port).unwrap();
        assert_eq!(conn.remote_addr().port(), port);
        conn.send(&[1, 2, 3, 4]).unwrap();

        let mut buf = [0u8; 64];
        let (len, from) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], &[1, 2, 3, 4]);
        assert_eq!(from.port(), conn.local_addr().unwrap().port());
        assert_eq!(conn.datagrams_sent(), 1);
        assert_eq!(conn.bytes_sent(), 4);
    }
}
