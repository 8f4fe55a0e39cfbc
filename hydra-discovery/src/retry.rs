//! Retry delay policy and the pending-retry slot.

use std::time::Duration;

/// Delay applied before retrying after a registry server was unreachable.
///
/// Retries never give up; the policy only decides how long to wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Base delay between attempts.
    pub delay: Duration,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl RetryPolicy {
    /// Create a policy with a fixed delay and no jitter.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: false,
        }
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Delay before the next attempt.
    ///
    /// With jitter enabled the result lies in `[delay, 1.25 * delay)`.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        if self.jitter {
            let jitter_factor = 1.0 + (rand_simple() * 0.25);
            Duration::from_secs_f64(self.delay.as_secs_f64() * jitter_factor).max(self.delay)
        } else {
            self.delay
        }
    }
}

/// Pseudo-random value in `[0, 1)` taken from the clock's sub-second nanos.
fn rand_simple() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos) / 1_000_000_000.0
}

/// Tracks whether a retry is already scheduled for one subsystem.
///
/// The registry refresh loop and the application resolver each own one
/// slot. Only the failure that finds the slot empty rotates the registry
/// list, so overlapping failures move the list by one position.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetrySlot {
    pending: bool,
}

impl RetrySlot {
    /// Record a failure that schedules a retry.
    ///
    /// Returns `true` when no retry was outstanding, i.e. this failure
    /// should fail over to the next registry server.
    pub(crate) fn schedule(&mut self) -> bool {
        let was_free = !self.pending;
        self.pending = true;
        was_free
    }

    /// The scheduled retry fired.
    pub(crate) fn fire(&mut self) {
        self.pending = false;
    }

    /// A fetch succeeded.
    pub(crate) fn clear(&mut self) {
        self.pending = false;
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.pending
    }
}
