//! Reconnection delay state used by the connection manager.

use std::time::Duration;

use super::config::BackoffPolicy;

/// Delay that doubles on every consecutive failure and resets on success.
///
/// The delay never drops below `policy.base` and never exceeds `policy.cap`.
#[derive(Clone, Debug)]
pub struct RetryDelay {
    policy: BackoffPolicy,
    current: Duration,
}

impl RetryDelay {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.base,
            policy,
        }
    }

    /// Delay to wait before the next attempt.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Double the delay after a failed attempt, capped at the ceiling.
    pub fn record_failure(&mut self) -> Duration {
        self.current = self
            .current
            .saturating_mul(2)
            .clamp(self.policy.base, self.policy.cap.max(self.policy.base));
        self.current
    }

    /// Return to the base delay after a successful attempt.
    pub fn reset(&mut self) {
        self.current = self.policy.base;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipper::config::{MAX_RETRY_DELAY, RETRY_DELAY};

    #[test]
    fn starts_at_base() {
        let delay = RetryDelay::new(BackoffPolicy::default());
        assert_eq!(delay.current(), RETRY_DELAY);
    }

    #[test]
    fn doubles_per_failure() {
        let mut delay = RetryDelay::new(BackoffPolicy::default());
        assert_eq!(delay.record_failure(), Duration::from_millis(200));
        assert_eq!(delay.record_failure(), Duration::from_millis(400));
        assert_eq!(delay.record_failure(), Duration::from_millis(800));
    }

    #[test]
    fn never_exceeds_cap() {
        let mut delay = RetryDelay::new(BackoffPolicy::default());
        for _ in 0..64 {
            delay.record_failure();
        }
        assert_eq!(delay.current(), MAX_RETRY_DELAY);
    }

    #[test]
    fn reset_returns_to_base() {
        let mut delay = RetryDelay::new(BackoffPolicy::default());
        delay.record_failure();
        delay.record_failure();
        delay.reset();
        assert_eq!(delay.current(), RETRY_DELAY);
    }
}
