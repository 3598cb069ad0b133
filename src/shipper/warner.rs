//! Rate-limited reporting of records rejected after shutdown.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Minimum spacing between two rejection warnings.
pub const REJECTION_WARN_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Default)]
struct WarnState {
    last: Option<Instant>,
    rejected: u64,
}

/// Counts rejected records and reports them at most once per interval.
///
/// The first report is emitted immediately; later reports are held back
/// until the interval has elapsed, then cover every rejection since.
pub(crate) struct RejectionWarner {
    interval: Duration,
    state: Mutex<WarnState>,
}

impl RejectionWarner {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Mutex::new(WarnState::default()),
        }
    }

    /// Count one rejected record and report if the interval allows.
    pub(crate) fn record(&self, report: impl FnOnce(u64)) {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.rejected += 1;
        let due = state
            .last
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if due {
            let count = std::mem::take(&mut state.rejected);
            state.last = Some(now);
            drop(state);
            report(count);
        }
    }

    /// Report any rejections not yet reported, regardless of the interval.
    pub(crate) fn flush(&self, report: impl FnOnce(u64)) {
        let mut state = self.state.lock();
        if state.rejected == 0 {
            return;
        }
        let count = std::mem::take(&mut state.rejected);
        state.last = Some(Instant::now());
        drop(state);
        report(count);
    }
}

impl Default for RejectionWarner {
    fn default() -> Self {
        Self::new(REJECTION_WARN_INTERVAL)
    }
}
