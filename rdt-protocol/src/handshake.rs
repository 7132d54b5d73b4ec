//! RDT Connection Setup
//!
//! The client opens a transfer with a single request byte. There is no
//! explicit reply: the first data segment from the server acknowledges the
//! request. Lost requests are retried under a [`RetryPolicy`].

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// The connection request datagram payload
pub const REQUEST: u8 = 0x01;

/// Default number of request attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default wait for a response to each request
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Handshake errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("No response after {attempts} connection attempts")]
    NoResponse { attempts: u32 },
}

/// Check whether a datagram is a connection request
#[inline]
pub fn is_request(datagram: &[u8]) -> bool {
    datagram == [REQUEST]
}

/// Bounded retry schedule for the connection request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts before giving up
    pub max_attempts: u32,
    /// Time to wait for a response per attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

/// Run `op` until it yields a value or the policy is exhausted
///
/// `op` receives the 1-based attempt number and the per-attempt timeout. It
/// returns `Ok(Some(value))` on success, `Ok(None)` when the attempt timed
/// out, or an error that aborts immediately.
///
/// # Example
///
/// ```
/// use rdt_protocol::handshake::{attempt, HandshakeError, RetryPolicy};
///
/// let result: Result<u32, HandshakeError> =
///     attempt(RetryPolicy::default(), |n, _| Ok((n == 3).then_some(n)));
/// assert_eq!(result, Ok(3));
/// ```
pub fn attempt<T, E, F>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    E: From<HandshakeError>,
    F: FnMut(u32, Duration) -> Result<Option<T>, E>,
{
    for n in 1..=policy.max_attempts {
        debug!(attempt = n, max = policy.max_attempts, "connection attempt");
        if let Some(value) = op(n, policy.timeout)? {
            return Ok(value);
        }
        warn!(
            attempt = n,
            timeout_ms = policy.timeout.as_millis() as u64,
            "no response to connection request"
        );
    }

    Err(HandshakeError::NoResponse {
        attempts: policy.max_attempts,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Handshake(HandshakeError),
        Io,
    }

    impl From<HandshakeError> for TestError {
        fn from(e: HandshakeError) -> Self {
            TestError::Handshake(e)
        }
    }

    #[test]
    fn test_is_request() {
        assert!(is_request(&[0x01]));
        assert!(!is_request(&[0x02]));
        assert!(!is_request(&[0x01, 0x00]));
        assert!(!is_request(&[]));
    }

    #[test]
    fn test_first_attempt_succeeds() {
        let mut calls = 0;
        let result: Result<&str, TestError> = attempt(RetryPolicy::default(), |_, _| {
            calls += 1;
            Ok(Some("ok"))
        });
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_exhaustion() {
        let mut calls = 0;
        let result: Result<(), TestError> = attempt(RetryPolicy::default(), |n, timeout| {
            calls += 1;
            assert_eq!(n, calls);
            assert_eq!(timeout, DEFAULT_ATTEMPT_TIMEOUT);
            Ok(None)
        });

        assert_eq!(calls, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(
            result,
            Err(TestError::Handshake(HandshakeError::NoResponse { attempts: 5 }))
        );
    }

    #[test]
    fn test_error_aborts_immediately() {
        let mut calls = 0;
        let result: Result<(), TestError> = attempt(RetryPolicy::default(), |_, _| {
            calls += 1;
            Err(TestError::Io)
        });
        assert_eq!(result, Err(TestError::Io));
        assert_eq!(calls, 1);
    }
}
