//! Auto-hide timer for the control overlay.
//!
//! Every interaction re-arms the timer; when the delay elapses without a new
//! interaction the controls fade out. Time is passed in explicitly so the
//! owner's update loop (and tests) decide what "now" is.
//!
//! # Usage
//! ```ignore
//! // On interaction:
//! timer.schedule(Instant::now());
//!
//! // In update loop:
//! if timer.tick(Instant::now()) {
//!     hide_controls();
//! }
//! ```

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ControlsTimer {
    delay: Duration,
    /// Instant at which the controls should hide
    deadline: Option<Instant>,
}

impl Default for ControlsTimer {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

impl ControlsTimer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Arm (or re-arm) the timer relative to `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
        log::trace!("ControlsTimer: hide scheduled in {}ms", self.delay.as_millis());
    }

    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            log::trace!("ControlsTimer: cancelled");
        }
    }

    /// True once when the deadline has passed. Clears the timer when it fires.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                log::trace!("ControlsTimer: fired");
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}
