//! Congestion Control for RDT
//!
//! Implements a TCP Reno style window: slow start, congestion avoidance and
//! fast recovery, driven by ACK, duplicate-ACK and timeout events. All window
//! values are in bytes.

use tracing::debug;

/// Default initial slow-start threshold (bytes)
pub const DEFAULT_SSTHRESH: u32 = 64 * 1024;

/// Congestion control phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CongestionPhase {
    /// Exponential growth until `ssthresh`
    SlowStart,
    /// Additive increase, roughly one MSS per round trip
    CongestionAvoidance,
    /// Window inflated while the lost segment is being repaired
    FastRecovery,
}

/// Events fed to the controller by the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CongestionEvent {
    /// A cumulative ACK advanced the window
    NewAck { acked_bytes: u32 },
    /// Third duplicate ACK for the same base
    TripleDupAck,
    /// Further duplicate ACK during fast recovery
    WindowInflate,
    /// Retransmission timer expired
    Timeout,
}

/// Congestion control state
#[derive(Debug, Clone)]
pub struct CongestionController {
    /// Maximum segment size (bytes)
    mss: u32,
    /// Congestion window (bytes)
    cwnd: u32,
    /// Slow start threshold (bytes)
    ssthresh: u32,
    /// Current phase
    phase: CongestionPhase,
}

impl CongestionController {
    /// Create a new congestion controller
    ///
    /// # Arguments
    /// * `mss` - Maximum segment size in bytes
    /// * `initial_ssthresh` - Initial slow start threshold in bytes
    pub fn new(mss: u32, initial_ssthresh: u32) -> Self {
        CongestionController {
            mss,
            cwnd: mss,
            ssthresh: initial_ssthresh,
            phase: CongestionPhase::SlowStart,
        }
    }

    /// Get current congestion window in bytes
    pub fn cwnd(&self) -> u32 {
        self.cwnd
    }

    /// Get current slow start threshold in bytes
    pub fn ssthresh(&self) -> u32 {
        self.ssthresh
    }

    /// Get current phase
    pub fn phase(&self) -> CongestionPhase {
        self.phase
    }

    /// Get maximum segment size
    pub fn mss(&self) -> u32 {
        self.mss
    }

    /// Apply one event to the window
    pub fn on_event(&mut self, event: CongestionEvent) {
        let before = self.phase;

        match event {
            CongestionEvent::NewAck { acked_bytes } => self.on_new_ack(acked_bytes),
            CongestionEvent::TripleDupAck => self.on_triple_dup_ack(),
            CongestionEvent::WindowInflate => self.on_window_inflate(),
            CongestionEvent::Timeout => self.on_timeout(),
        }

        if before != self.phase {
            debug!(
                from = ?before,
                to = ?self.phase,
                cwnd = self.cwnd,
                ssthresh = self.ssthresh,
                "congestion phase change"
            );
        }
    }

    /// Record a cumulative ACK covering `acked_bytes`
    pub fn on_new_ack(&mut self, acked_bytes: u32) {
        match self.phase {
            CongestionPhase::SlowStart => {
                self.cwnd = self.cwnd.saturating_add(acked_bytes);
                if self.cwnd >= self.ssthresh {
                    self.phase = CongestionPhase::CongestionAvoidance;
                }
            }
            CongestionPhase::CongestionAvoidance => {
                let increment = (self.mss as u64 * acked_bytes as u64) / self.cwnd as u64;
                self.cwnd = self.cwnd.saturating_add((increment as u32).max(1));
            }
            CongestionPhase::FastRecovery => {
                // Deflate back to the threshold
                self.cwnd = self.ssthresh;
                self.phase = CongestionPhase::CongestionAvoidance;
            }
        }
    }

    /// Record the third duplicate ACK (fast retransmit)
    ///
    /// Re-triggerable from fast recovery.
    pub fn on_triple_dup_ack(&mut self) {
        self.ssthresh = self.halved_window();
        self.cwnd = self.ssthresh.saturating_add(3 * self.mss);
        self.phase = CongestionPhase::FastRecovery;
    }

    /// Inflate the window for an additional duplicate ACK
    ///
    /// Ignored outside fast recovery.
    pub fn on_window_inflate(&mut self) {
        if self.phase == CongestionPhase::FastRecovery {
            self.cwnd = self.cwnd.saturating_add(self.mss);
        }
    }

    /// Record a retransmission timeout
    pub fn on_timeout(&mut self) {
        self.ssthresh = self.halved_window();
        self.cwnd = self.mss;
        self.phase = CongestionPhase::SlowStart;
    }

    fn halved_window(&self) -> u32 {
        (self.cwnd / 2).max(2 * self.mss)
    }

    /// Get statistics
    pub fn stats(&self) -> CongestionStats {
        CongestionStats {
            cwnd: self.cwnd,
            ssthresh: self.ssthresh,
            phase: self.phase,
        }
    }
}

/// Congestion control statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CongestionStats {
    /// Current congestion window (bytes)
    pub cwnd: u32,
    /// Slow start threshold (bytes)
    pub ssthresh: u32,
    /// Current phase
    pub phase: CongestionPhase,
}
