//! # Conflict Backoff
//!
//! Bounded retry policy for optimistic-concurrency conflicts. A write that
//! loses a compare-and-swap race is retried from a fresh read after a short,
//! geometrically growing wait, up to a fixed number of attempts.
//!
//! Default sequence: 5 attempts, waiting 10ms, 20ms, 40ms, 80ms in between.

use std::time::Duration;

/// Retry schedule for conflicting writes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictBackoff {
    /// Maximum number of write attempts (including the first)
    steps: u32,
    /// Wait before the second attempt
    initial: Duration,
    /// Multiplier applied to each subsequent wait
    factor: f64,
    /// Upper bound on any single wait
    cap: Duration,
}

impl ConflictBackoff {
    /// Create a backoff with the given attempt budget and wait growth.
    ///
    /// `steps` is clamped to at least 1 and `factor` to at least 1.0.
    #[must_use]
    pub fn new(steps: u32, initial: Duration, factor: f64, cap: Duration) -> Self {
        Self {
            steps: steps.max(1),
            initial,
            factor: factor.max(1.0),
            cap,
        }
    }

    /// Total number of write attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.steps
    }

    /// Wait after the `attempt`-th conflict (1-based), or `None` once the
    /// budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.steps {
            return None;
        }
        let exp = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * self.factor.powi(exp);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(self.cap);
        Some(delay.min(self.cap))
    }

    /// Waits between consecutive attempts; yields `max_attempts() - 1` items.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.steps).filter_map(move |attempt| self.next_delay(attempt))
    }
}

impl Default for ConflictBackoff {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(10), 2.0, Duration::from_secs(1))
    }
}
