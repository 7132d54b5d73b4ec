//! Round-trip time estimation and retransmission timeout
//!
//! Jacobson/Karels smoothing of clean RTT samples. Timeouts back the RTO off
//! multiplicatively without disturbing the smoothed estimates; the next clean
//! sample recomputes the RTO from them.

use std::time::Duration;

/// Lower bound on the retransmission timeout
pub const RTO_MIN: Duration = Duration::from_millis(200);

/// Upper bound on the retransmission timeout
pub const RTO_MAX: Duration = Duration::from_secs(3);

/// Retransmission timeout before the first sample
pub const INITIAL_RTO: Duration = Duration::from_secs(1);

/// Multiplier applied to the RTO on each timeout
pub const RTO_BACKOFF: f64 = 1.5;

const ALPHA: f64 = 0.125;
const BETA: f64 = 0.25;
const K: f64 = 4.0;

/// RTT (Round-Trip Time) estimator
///
/// Tracks RTT measurements and calculates smoothed RTT, deviation and RTO.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    /// Smoothed RTT (seconds), `None` until the first sample
    srtt: Option<f64>,
    /// RTT deviation (seconds)
    rtt_var: f64,
    /// Current retransmission timeout
    rto: Duration,
    /// Number of samples
    sample_count: u32,
}

impl RttEstimator {
    /// Create a new RTT estimator with [`INITIAL_RTO`]
    pub fn new() -> Self {
        Self::with_initial_rto(INITIAL_RTO)
    }

    /// Create an estimator starting from `initial_rto` (clamped to bounds)
    pub fn with_initial_rto(initial_rto: Duration) -> Self {
        RttEstimator {
            srtt: None,
            rtt_var: 0.0,
            rto: initial_rto.clamp(RTO_MIN, RTO_MAX),
            sample_count: 0,
        }
    }

    /// Update with a clean (never retransmitted) RTT sample
    pub fn update(&mut self, sample: Duration) {
        let sample = sample.as_secs_f64();

        let srtt = match self.srtt {
            None => {
                self.rtt_var = sample / 2.0;
                sample
            }
            Some(srtt) => {
                self.rtt_var = (1.0 - BETA) * self.rtt_var + BETA * (srtt - sample).abs();
                (1.0 - ALPHA) * srtt + ALPHA * sample
            }
        };
        self.srtt = Some(srtt);
        self.sample_count += 1;

        self.rto = Duration::from_secs_f64(srtt + K * self.rtt_var).clamp(RTO_MIN, RTO_MAX);
    }

    /// Exponential backoff after a retransmission timeout
    pub fn backoff(&mut self) {
        self.rto = self.rto.mul_f64(RTO_BACKOFF).min(RTO_MAX);
    }

    /// Current retransmission timeout
    pub fn rto(&self) -> Duration {
        self.rto
    }

    /// Smoothed RTT, if any sample has been taken
    pub fn srtt(&self) -> Option<Duration> {
        self.srtt.map(Duration::from_secs_f64)
    }

    /// RTT deviation
    pub fn rtt_var(&self) -> Duration {
        Duration::from_secs_f64(self.rtt_var)
    }

    /// Number of samples taken
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new()
    }
}
