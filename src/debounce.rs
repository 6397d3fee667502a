// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Debounced trigger.
//!
//! Coalesces a burst of events (scroll, resize, rapid page flips) into one
//! action after a quiet period. `trigger` cancels the pending deadline and
//! schedules a new one; `fire` reports readiness once per quiet period.
//! Time is passed in explicitly, so the primitive is testable without
//! sleeping.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Reset the quiet-period timer.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once after the quiet period has elapsed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);

    #[test]
    fn test_fires_after_quiet_period() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.trigger(t0);
        assert!(!d.fire(t0));
        assert!(!d.fire(t0 + Duration::from_millis(99)));
        assert!(d.fire(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_fires_only_once_per_trigger() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.trigger(t0);
        assert!(d.fire(t0 + DELAY));
        assert!(!d.fire(t0 + DELAY * 2));
        assert!(!d.pending());
    }

    #[test]
    fn test_retrigger_extends_deadline() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.trigger(t0);
        d.trigger(t0 + Duration::from_millis(50));
        assert!(!d.fire(t0 + Duration::from_millis(120)));
        assert!(d.fire(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_idle_never_fires() {
        let mut d = Debouncer::new(DELAY);
        assert!(!d.fire(Instant::now() + Duration::from_secs(10)));
    }
}
