use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline plus a shared stop flag for cooperative search cancellation.
///
/// Cloning shares the flag, so a clone handed to another thread can call
/// [`TimeControl::stop`] to abandon an in-flight search.
#[derive(Debug, Clone)]
pub struct TimeControl {
    stopped: Arc<AtomicBool>,
    start: Instant,
    limit: Option<Duration>,
}

impl Default for TimeControl {
    fn default() -> Self { Self::new(None) }
}

impl TimeControl {
    pub fn new(limit: Option<Duration>) -> Self {
        Self { stopped: Arc::new(AtomicBool::new(false)), start: Instant::now(), limit }
    }

    /// Restarts the clock with a new limit and clears the stop flag.
    pub fn restart(&mut self, limit: Option<Duration>) {
        self.start = Instant::now();
        self.limit = limit;
        self.stopped.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) { self.stopped.store(true, Ordering::SeqCst); }

    #[inline]
    pub fn is_stopped(&self) -> bool { self.stopped.load(Ordering::Relaxed) }

    /// Reads the clock; trips the stop flag once the limit has elapsed.
    pub fn check_time(&self) -> bool {
        if self.is_stopped() { return true; }
        if let Some(limit) = self.limit {
            if self.start.elapsed() >= limit {
                self.stop();
                return true;
            }
        }
        false
    }

    pub fn elapsed(&self) -> Duration { self.start.elapsed() }

    pub fn remaining(&self) -> Option<Duration> {
        self.limit.map(|l| l.saturating_sub(self.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_expires() {
        let tc = TimeControl::new(None);
        assert!(!tc.check_time());
        assert_eq!(tc.remaining(), None);
    }

    #[test]
    fn zero_limit_expires_immediately() {
        let tc = TimeControl::new(Some(Duration::ZERO));
        assert!(tc.check_time());
        assert!(tc.is_stopped());
    }

    #[test]
    fn stop_is_shared_between_clones() {
        let mut tc = TimeControl::new(None);
        let handle = tc.clone();
        handle.stop();
        assert!(tc.is_stopped());
        tc.restart(None);
        assert!(!handle.is_stopped());
    }
}
