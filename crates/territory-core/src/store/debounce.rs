//! Single-slot, most-recent-wins debounce timer.
//!
//! Arming pushes the deadline out to `now + delay`; only the latest arm
//! counts. The timer never fires on its own: the owner polls `is_due` from
//! its event loop or autosave thread and calls `fire` once it is.

use std::time::{Duration, Instant};

/// Default persistence debounce delay.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Clone, Debug)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)schedule the timer, cancelling any earlier deadline.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Disarm if due. Returns whether the timer fired.
    pub fn fire(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}

impl Default for DebounceTimer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_timer_never_fires() {
        let mut timer = DebounceTimer::default();
        let now = Instant::now();
        assert!(!timer.is_due(now + Duration::from_secs(60)));
        assert!(!timer.fire(now + Duration::from_secs(60)));
    }

    #[test]
    fn fires_once_after_delay() {
        let mut timer = DebounceTimer::new(Duration::from_millis(300));
        let t0 = Instant::now();
        timer.arm(t0);
        assert!(!timer.fire(t0 + Duration::from_millis(299)));
        assert!(timer.fire(t0 + Duration::from_millis(300)));
        assert!(!timer.is_armed());
        assert!(!timer.fire(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn rearming_pushes_deadline_out() {
        let mut timer = DebounceTimer::new(Duration::from_millis(300));
        let t0 = Instant::now();
        timer.arm(t0);
        timer.arm(t0 + Duration::from_millis(200));
        timer.arm(t0 + Duration::from_millis(400));
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_millis(700)));
        assert!(!timer.is_due(t0 + Duration::from_millis(650)));
        assert!(timer.is_due(t0 + Duration::from_millis(700)));
    }

    #[test]
    fn cancel_disarms() {
        let mut timer = DebounceTimer::default();
        let t0 = Instant::now();
        timer.arm(t0);
        timer.cancel();
        assert!(!timer.is_due(t0 + Duration::from_secs(1)));
        assert_eq!(timer.deadline(), None);
    }
}
