//! Transfer configuration and errors
//!
//! Settings shared by the sender and receiver pipelines, plus the error type
//! that ends a transfer.

use crate::congestion::DEFAULT_SSTHRESH;
use crate::packet::MAX_PAYLOAD_SIZE;
use crate::rtt::INITIAL_RTO;
use std::time::Duration;
use thiserror::Error;

/// Default number of consecutive timeouts tolerated before aborting
pub const DEFAULT_MAX_CONSECUTIVE_TIMEOUTS: u32 = 10;

/// Default number of times the EOF marker is sent
pub const DEFAULT_EOF_REPEATS: u32 = 5;

/// Default gap between EOF marker copies
pub const DEFAULT_EOF_INTERVAL: Duration = Duration::from_millis(100);

/// Default bound on out-of-order segments held by the receiver
pub const DEFAULT_MAX_BUFFERED_SEGMENTS: usize = 200;

/// How the sender bounds bytes in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    /// Constant send window (bytes); the congestion controller still runs
    /// but does not limit sending
    Fixed(u32),
    /// Window follows the congestion controller
    Congestion {
        /// Starting slow-start threshold (bytes)
        initial_ssthresh: u32,
    },
}

impl Default for WindowPolicy {
    fn default() -> Self {
        WindowPolicy::Congestion {
            initial_ssthresh: DEFAULT_SSTHRESH,
        }
    }
}

/// Sender pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SenderConfig {
    /// Maximum payload per segment (bytes)
    pub mss: u32,
    /// Window policy
    pub window: WindowPolicy,
    /// Consecutive timeouts after which the transfer is abandoned
    pub max_consecutive_timeouts: u32,
    /// Number of EOF markers sent once all data is acknowledged
    pub eof_repeats: u32,
    /// Gap between consecutive EOF markers
    pub eof_interval: Duration,
    /// Retransmission timeout before the first RTT sample
    pub initial_rto: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            mss: MAX_PAYLOAD_SIZE as u32,
            window: WindowPolicy::default(),
            max_consecutive_timeouts: DEFAULT_MAX_CONSECUTIVE_TIMEOUTS,
            eof_repeats: DEFAULT_EOF_REPEATS,
            eof_interval: DEFAULT_EOF_INTERVAL,
            initial_rto: INITIAL_RTO,
        }
    }
}

impl SenderConfig {
    /// Sender with a fixed send window of `sws` bytes
    pub fn fixed_window(sws: u32) -> Self {
        SenderConfig {
            window: WindowPolicy::Fixed(sws),
            ..Default::default()
        }
    }

    /// Check that the configuration can make progress
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.mss == 0 || self.mss as usize > MAX_PAYLOAD_SIZE {
            return Err(TransferError::InvalidConfig(format!(
                "mss must be between 1 and {MAX_PAYLOAD_SIZE}, got {}",
                self.mss
            )));
        }
        if let WindowPolicy::Fixed(sws) = self.window {
            if sws < self.mss {
                return Err(TransferError::InvalidConfig(format!(
                    "send window {sws} is smaller than one segment ({})",
                    self.mss
                )));
            }
        }
        if self.max_consecutive_timeouts == 0 {
            return Err(TransferError::InvalidConfig(
                "max_consecutive_timeouts must be at least 1".to_string(),
            ));
        }
        if self.eof_repeats == 0 {
            return Err(TransferError::InvalidConfig(
                "eof_repeats must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Receiver pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Maximum out-of-order segments held at once
    pub max_buffered_segments: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            max_buffered_segments: DEFAULT_MAX_BUFFERED_SEGMENTS,
        }
    }
}

/// Errors that end a transfer
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Transfer abandoned after {consecutive_timeouts} consecutive timeouts")]
    Unrecoverable { consecutive_timeouts: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SenderConfig::default();
        assert_eq!(config.mss, 1180);
        assert!(config.validate().is_ok());
        assert!(ReceiverConfig::default().max_buffered_segments > 0);
    }

    #[test]
    fn test_fixed_window_below_mss_rejected() {
        let config = SenderConfig::fixed_window(1000);
        assert!(matches!(
            config.validate(),
            Err(TransferError::InvalidConfig(_))
        ));

        assert!(SenderConfig::fixed_window(1180).validate().is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = SenderConfig {
            max_consecutive_timeouts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SenderConfig {
            mss: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SenderConfig {
            mss: 1181,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_error_display() {
        let err = TransferError::Unrecoverable {
            consecutive_timeouts: 10,
        };
        assert_eq!(
            err.to_string(),
            "Transfer abandoned after 10 consecutive timeouts"
        );
    }
}
