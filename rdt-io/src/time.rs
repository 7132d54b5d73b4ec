//! Time utilities for RDT drivers
//!
//! The protocol core takes `now` from its caller; these helpers turn its
//! deadlines into bounded socket waits and drive periodic work.

use std::time::{Duration, Instant};

/// Time left until `deadline`, capped at `max`
///
/// Returns `Duration::ZERO` once the deadline has passed. A `None` deadline
/// yields `max`.
#[inline]
pub fn time_until(deadline: Option<Instant>, now: Instant, max: Duration) -> Duration {
    match deadline {
        Some(deadline) => deadline.saturating_duration_since(now).min(max),
        None => max,
    }
}

/// Timer for periodic operations
///
/// Used for progress reports and idle detection.
#[derive(Debug, Clone)]
pub struct Timer {
    interval: Duration,
    last_fire: Instant,
}

impl Timer {
    /// Create a new timer with the given interval, starting at `now`
    pub fn new(interval: Duration, now: Instant) -> Self {
        Timer {
            interval,
            last_fire: now,
        }
    }

    /// Timer interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if the timer has expired
    pub fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_fire) >= self.interval
    }

    /// Reset the timer
    pub fn reset(&mut self, now: Instant) {
        self.last_fire = now;
    }

    /// Instant at which the timer next expires
    pub fn deadline(&self) -> Instant {
        self.last_fire + self.interval
    }

    /// Get time until next expiration
    pub fn time_until_expiration(&self, now: Instant) -> Duration {
        self.deadline().saturating_duration_since(now)
    }

    /// Fire the timer if expired, returning true if it fired
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if self.expired(now) {
            self.reset(now);
            true
        } else {
            false
        }
    }
}
