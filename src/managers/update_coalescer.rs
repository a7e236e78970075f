//! Deadline-based debouncing and patch coalescing.
//!
//! Nothing here owns a timer. The caller's event loop asks for [`Debouncer::deadline`],
//! sleeps until it, and then polls. This keeps the logic synchronous and testable
//! with synthetic instants.

use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use crate::services::settings_normalizer::merge_patch;

/// Default quiet period for commits and legend refreshes.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

/// Fires once after `delay` has passed since the most recent `schedule`.
#[derive(Debug, Clone)]
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

    /// Starts or restarts the quiet period.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once per schedule, when the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Merges rapid successive patches and releases the merged result after a quiet period.
#[derive(Debug, Clone)]
pub struct PatchCoalescer {
    pending: Option<Value>,
    timer: Debouncer,
}

impl PatchCoalescer {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: None,
            timer: Debouncer::new(delay),
        }
    }

    /// Adds a patch and restarts the quiet period.
    pub fn push(&mut self, patch: &Value, now: Instant) {
        let base = self
            .pending
            .take()
            .unwrap_or_else(|| Value::Object(Map::new()));
        self.pending = Some(merge_patch(&base, patch));
        self.timer.schedule(now);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The merged patch, once the quiet period has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<Value> {
        if self.timer.fire_if_due(now) {
            self.pending.take()
        } else {
            None
        }
    }

    /// The merged patch regardless of the timer.
    pub fn flush(&mut self) -> Option<Value> {
        self.timer.cancel();
        self.pending.take()
    }
}

impl Default for PatchCoalescer {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}
