//! UDP socket wrapper for RDT
//!
//! [`DatagramSocket`] is the seam between the session drivers and the
//! network: a blocking send and a receive bounded by a timeout. [`RdtSocket`]
//! implements it over a real UDP socket configured through `socket2`.

use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use thiserror::Error;

/// Shortest read timeout handed to the OS (zero would mean "block forever")
pub const MIN_RECV_TIMEOUT: Duration = Duration::from_millis(1);

/// Socket errors
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid socket address")]
    InvalidAddress,

    #[error("Peer endpoint disconnected")]
    Disconnected,
}

/// Datagram transport used by the session drivers
pub trait DatagramSocket {
    /// Send one datagram to `target`
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError>;

    /// Wait up to `timeout` for one datagram
    ///
    /// Returns `Ok(None)` if nothing arrived in time. Datagrams longer than
    /// `buf` are truncated.
    fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, SocketAddr)>, SocketError>;

    /// Local address of this endpoint
    fn local_addr(&self) -> Result<SocketAddr, SocketError>;
}

/// RDT UDP socket
///
/// Blocking socket whose receives are bounded by a per-call timeout.
#[derive(Debug)]
pub struct RdtSocket {
    inner: UdpSocket,
}

impl RdtSocket {
    /// Create a new socket bound to the given address
    pub fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.set_nonblocking(false)?;

        Ok(RdtSocket {
            inner: socket.into(),
        })
    }

    /// Set the kernel send and receive buffer sizes
    pub fn set_buffer_sizes(&self, send: usize, recv: usize) -> Result<(), SocketError> {
        let socket = socket2::SockRef::from(&self.inner);
        socket.set_send_buffer_size(send)?;
        socket.set_recv_buffer_size(recv)?;
        Ok(())
    }

    /// Get the kernel receive buffer size
    pub fn recv_buffer_size(&self) -> Result<usize, SocketError> {
        Ok(socket2::SockRef::from(&self.inner).recv_buffer_size()?)
    }

    /// Try to clone the socket
    pub fn try_clone(&self) -> Result<Self, SocketError> {
        Ok(RdtSocket {
            inner: self.inner.try_clone()?,
        })
    }

    /// Get a reference to the underlying socket
    pub fn as_udp_socket(&self) -> &UdpSocket {
        &self.inner
    }
}

impl DatagramSocket for RdtSocket {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        Ok(self.inner.send_to(buf, target)?)
    }

    fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, SocketAddr)>, SocketError> {
        self.inner
            .set_read_timeout(Some(timeout.max(MIN_RECV_TIMEOUT)))?;

        match self.inner.recv_from(buf) {
            Ok((n, addr)) => Ok(Some((n, addr))),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            // ICMP port unreachable from an earlier send surfaces here on some platforms
            Err(e) if e.kind() == ErrorKind::ConnectionReset => Ok(None),
            Err(e) => Err(SocketError::Io(e)),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.inner.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_creation() {
        let socket = RdtSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = socket.local_addr().unwrap();
        assert!(addr.port() > 0);
    }

    #[test]
    fn test_socket_buffer_sizes() {
        let socket = RdtSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();

        // May not match exactly due to OS limits
        socket.set_buffer_sizes(262144, 262144).unwrap();
        assert!(socket.recv_buffer_size().unwrap() > 0);
    }

    #[test]
    fn test_socket_send_recv() {
        let sender = RdtSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let receiver = RdtSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();

        let data = b"Hello, RDT!";
        sender
            .send_to(data, receiver.local_addr().unwrap())
            .unwrap();

        let mut buf = [0u8; 1024];
        let (n, from) = receiver
            .recv_timeout(&mut buf, Duration::from_secs(1))
            .unwrap()
            .expect("datagram should arrive");
        assert_eq!(&buf[..n], data);
        assert_eq!(from, sender.local_addr().unwrap());
    }

    #[test]
    fn test_recv_timeout_elapses() {
        let socket = RdtSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let mut buf = [0u8; 64];

        let start = std::time::Instant::now();
        let result = socket
            .recv_timeout(&mut buf, Duration::from_millis(20))
            .unwrap();
        assert!(result.is_none());
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_socket_ipv6() {
        // May fail on systems without IPv6
        if let Ok(socket) = RdtSocket::bind("[::1]:0".parse().unwrap()) {
            let addr = socket.local_addr().unwrap();
            assert!(addr.is_ipv6());
        }
    }
}
