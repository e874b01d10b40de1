//! Debounced search input.
//!
//! Each keystroke resets a quiet-period deadline; only the last value
//! within the window commits. Expressed as an explicit state machine over
//! injected instants so tests drive time instead of sleeping.

use std::time::{Duration, Instant};

/// Coalesces rapid search input into a single committed value.
#[derive(Debug)]
pub struct SearchDebouncer {
    window: Duration,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    value: String,
    deadline: Instant,
}

impl SearchDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Records a keystroke, resetting the quiet-period deadline.
    pub fn input(&mut self, value: impl Into<String>, now: Instant) {
        self.pending = Some(Pending {
            value: value.into(),
            deadline: now + self.window,
        });
    }

    /// Commits the pending value once the quiet window has elapsed.
    ///
    /// Returns the value exactly once; subsequent polls return `None` until
    /// new input arrives.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some(p) if now >= p.deadline => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }

    /// Whether a value is waiting for its quiet window to elapse.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
