//! The single wait point of a session
//!
//! Each iteration of a driver loop blocks in exactly one place: a socket
//! receive bounded by the protocol's next deadline. Whichever happens first
//! becomes the [`Event`] that iteration processes.

use bytes::Bytes;
use rdt_io::socket::{DatagramSocket, SocketError};
use rdt_io::time::time_until;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Receive buffer size; larger than any valid datagram so oversized ones are
/// seen as malformed rather than silently truncated to a valid length
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Outcome of one bounded wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A datagram arrived
    Datagram { payload: Bytes, from: SocketAddr },
    /// The deadline (or the maximum wait) passed with nothing received
    DeadlineElapsed,
}

/// Block until a datagram arrives or `deadline` passes
///
/// The wait never exceeds `max_wait`, so a `None` deadline still returns
/// periodically. An already-expired deadline returns immediately.
pub fn wait_for_event<S>(
    socket: &S,
    buf: &mut [u8],
    deadline: Option<Instant>,
    max_wait: Duration,
) -> Result<Event, SocketError>
where
    S: DatagramSocket + ?Sized,
{
    let timeout = time_until(deadline, Instant::now(), max_wait);
    if timeout.is_zero() {
        return Ok(Event::DeadlineElapsed);
    }

    match socket.recv_timeout(buf, timeout)? {
        Some((n, from)) => Ok(Event::Datagram {
            payload: Bytes::copy_from_slice(&buf[..n]),
            from,
        }),
        None => Ok(Event::DeadlineElapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdt_io::memory::MemorySocket;

    fn pair() -> (MemorySocket, MemorySocket) {
        MemorySocket::pair(
            "127.0.0.1:1".parse().unwrap(),
            "127.0.0.1:2".parse().unwrap(),
        )
    }

    #[test]
    fn test_datagram_event() {
        let (a, b) = pair();
        a.send_to(b"hi", b.local_addr().unwrap()).unwrap();

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let event = wait_for_event(&b, &mut buf, None, Duration::from_millis(50)).unwrap();
        assert_eq!(
            event,
            Event::Datagram {
                payload: Bytes::from_static(b"hi"),
                from: a.local_addr().unwrap(),
            }
        );
    }

    #[test]
    fn test_expired_deadline_returns_immediately() {
        let (a, b) = pair();
        a.send_to(b"queued", b.local_addr().unwrap()).unwrap();

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let past = Instant::now() - Duration::from_millis(1);
        let event = wait_for_event(&b, &mut buf, Some(past), Duration::from_secs(1)).unwrap();
        assert_eq!(event, Event::DeadlineElapsed);
    }

    #[test]
    fn test_deadline_elapses() {
        let (_a, b) = pair();
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let deadline = Instant::now() + Duration::from_millis(10);

        let event = wait_for_event(&b, &mut buf, Some(deadline), Duration::from_secs(1)).unwrap();
        assert_eq!(event, Event::DeadlineElapsed);
        assert!(Instant::now() >= deadline);
    }
}
