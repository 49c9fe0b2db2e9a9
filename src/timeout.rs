// Upload watchdog - a stuck upload must not hold the store forever

use std::time::{Duration, Instant};

/// Re-armable countdown guarding an upload session.
///
/// Expiry is not delivered on a timer thread; the store checks the deadline
/// on entry to every operation and runs the abort path there, so expiry and
/// an explicit `finish()` live in the same synchronization domain and cannot
/// interleave. Disarming an already-disarmed guard is a no-op.
#[derive(Debug)]
pub(crate) struct TimeoutGuard {
    interval: Duration,
    deadline: Option<Instant>,
}

impl TimeoutGuard {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Start (or restart) the countdown from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.interval);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn expired(&self) -> bool {
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }
}
