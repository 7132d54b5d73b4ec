//! Per-transfer summaries returned by the session drivers

use rdt_protocol::{CongestionStats, ReceiverStats, SenderStats};
use std::time::Duration;

/// Summary of a completed send
#[derive(Debug, Clone, PartialEq)]
pub struct SendReport {
    /// Stream length in bytes
    pub bytes: u64,
    /// Wall-clock duration from first segment to EOF
    pub duration: Duration,
    /// Sender counters
    pub stats: SenderStats,
    /// Congestion window at the end of the transfer
    pub congestion: CongestionStats,
    /// Smoothed RTT at the end of the transfer
    pub srtt: Option<Duration>,
    /// Retransmission timeout at the end of the transfer
    pub rto: Duration,
}

impl SendReport {
    /// Goodput in bits per second
    pub fn throughput_bps(&self) -> f64 {
        throughput_bps(self.bytes, self.duration)
    }
}

/// Summary of a completed receive
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiveReport {
    /// Bytes written to the sink
    pub bytes: u64,
    /// Wall-clock duration from the first request to stream completion
    pub duration: Duration,
    /// Connection attempts used
    pub attempts: u32,
    /// Receiver counters
    pub stats: ReceiverStats,
}

impl ReceiveReport {
    /// Goodput in bits per second
    pub fn throughput_bps(&self) -> f64 {
        throughput_bps(self.bytes, self.duration)
    }
}

fn throughput_bps(bytes: u64, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 * 8.0 / secs
    } else {
        0.0
    }
}
