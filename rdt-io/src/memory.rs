//! In-memory datagram link for tests
//!
//! [`MemorySocket::pair`] returns two connected endpoints backed by
//! `crossbeam` channels. Each endpoint can be given a filter that decides the
//! fate of every outbound datagram, which lets tests drop, duplicate or
//! reorder traffic deterministically.

use crate::socket::{DatagramSocket, SocketError};
use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::trace;

/// Fate of an outbound datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Pass through unchanged
    Deliver,
    /// Silently lose it
    Drop,
    /// Deliver it twice
    Duplicate,
    /// Hold it back until after the next delivered datagram
    Hold,
}

/// Per-datagram fault decision
pub type Filter = Box<dyn FnMut(&[u8]) -> Delivery + Send>;

type Datagram = (Bytes, SocketAddr);

struct Outbound {
    filter: Option<Filter>,
    held: Vec<Bytes>,
}

/// One end of an in-memory link
pub struct MemorySocket {
    local: SocketAddr,
    tx: Sender<Datagram>,
    rx: Receiver<Datagram>,
    outbound: Mutex<Outbound>,
}

impl MemorySocket {
    /// Create two connected endpoints with the given addresses
    pub fn pair(a: SocketAddr, b: SocketAddr) -> (MemorySocket, MemorySocket) {
        let (tx_ab, rx_ab) = channel::unbounded();
        let (tx_ba, rx_ba) = channel::unbounded();
        (
            MemorySocket::new(a, tx_ab, rx_ba),
            MemorySocket::new(b, tx_ba, rx_ab),
        )
    }

    fn new(local: SocketAddr, tx: Sender<Datagram>, rx: Receiver<Datagram>) -> Self {
        MemorySocket {
            local,
            tx,
            rx,
            outbound: Mutex::new(Outbound {
                filter: None,
                held: Vec::new(),
            }),
        }
    }

    /// Install a filter applied to every datagram sent from this endpoint
    pub fn set_filter<F>(&self, filter: F)
    where
        F: FnMut(&[u8]) -> Delivery + Send + 'static,
    {
        self.outbound.lock().filter = Some(Box::new(filter));
    }

    /// Remove the filter, delivering anything still held
    pub fn clear_filter(&self) -> Result<(), SocketError> {
        let held = {
            let mut outbound = self.outbound.lock();
            outbound.filter = None;
            std::mem::take(&mut outbound.held)
        };
        for datagram in held {
            self.push(datagram)?;
        }
        Ok(())
    }

    fn push(&self, datagram: Bytes) -> Result<(), SocketError> {
        self.tx
            .send((datagram, self.local))
            .map_err(|_| SocketError::Disconnected)
    }
}

impl DatagramSocket for MemorySocket {
    fn send_to(&self, buf: &[u8], _target: SocketAddr) -> Result<usize, SocketError> {
        let mut outbound = self.outbound.lock();
        let delivery = match outbound.filter.as_mut() {
            Some(filter) => filter(buf),
            None => Delivery::Deliver,
        };
        trace!(len = buf.len(), ?delivery, "memory link send");

        let datagram = Bytes::copy_from_slice(buf);
        match delivery {
            Delivery::Drop => {}
            Delivery::Hold => outbound.held.push(datagram),
            Delivery::Deliver | Delivery::Duplicate => {
                if delivery == Delivery::Duplicate {
                    self.push(datagram.clone())?;
                }
                self.push(datagram)?;
                for held in std::mem::take(&mut outbound.held) {
                    self.push(held)?;
                }
            }
        }

        Ok(buf.len())
    }

    fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<(usize, SocketAddr)>, SocketError> {
        match self.rx.recv_timeout(timeout) {
            Ok((datagram, from)) => {
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(Some((n, from)))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SocketError::Disconnected),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (MemorySocket, MemorySocket) {
        MemorySocket::pair(
            "10.0.0.1:9000".parse().unwrap(),
            "10.0.0.2:9000".parse().unwrap(),
        )
    }

    fn recv(socket: &MemorySocket) -> Option<Vec<u8>> {
        let mut buf = [0u8; 64];
        socket
            .recv_timeout(&mut buf, Duration::from_millis(10))
            .unwrap()
            .map(|(n, _)| buf[..n].to_vec())
    }

    #[test]
    fn test_pass_through() {
        let (a, b) = pair();
        let to = b.local_addr().unwrap();

        a.send_to(b"ping", to).unwrap();

        let mut buf = [0u8; 64];
        let (n, from) = b
            .recv_timeout(&mut buf, Duration::from_millis(10))
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"ping");
        assert_eq!(from, a.local_addr().unwrap());
        assert!(recv(&b).is_none());
    }

    #[test]
    fn test_drop_and_duplicate() {
        let (a, b) = pair();
        let to = b.local_addr().unwrap();
        a.set_filter(|d| match d {
            b"lost" => Delivery::Drop,
            b"twice" => Delivery::Duplicate,
            _ => Delivery::Deliver,
        });

        a.send_to(b"lost", to).unwrap();
        a.send_to(b"twice", to).unwrap();

        assert_eq!(recv(&b).unwrap(), b"twice");
        assert_eq!(recv(&b).unwrap(), b"twice");
        assert!(recv(&b).is_none());
    }

    #[test]
    fn test_hold_reorders() {
        let (a, b) = pair();
        let to = b.local_addr().unwrap();
        let mut first = true;
        a.set_filter(move |_| {
            if std::mem::take(&mut first) {
                Delivery::Hold
            } else {
                Delivery::Deliver
            }
        });

        a.send_to(b"one", to).unwrap();
        assert!(recv(&b).is_none());
        a.send_to(b"two", to).unwrap();

        assert_eq!(recv(&b).unwrap(), b"two");
        assert_eq!(recv(&b).unwrap(), b"one");
    }

    #[test]
    fn test_clear_filter_releases_held() {
        let (a, b) = pair();
        a.set_filter(|_| Delivery::Hold);
        a.send_to(b"held", b.local_addr().unwrap()).unwrap();

        a.clear_filter().unwrap();
        assert_eq!(recv(&b).unwrap(), b"held");
    }

    #[test]
    fn test_disconnected_peer() {
        let (a, b) = pair();
        drop(b);

        let mut buf = [0u8; 8];
        assert!(matches!(
            a.recv_timeout(&mut buf, Duration::from_millis(1)),
            Err(SocketError::Disconnected)
        ));
    }
}
