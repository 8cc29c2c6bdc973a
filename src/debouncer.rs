use std::time::Duration;
use tokio::time::Instant;

/// A simple debouncer that tracks when an action should be triggered
/// after a period of inactivity.
///
/// Runs on tokio's clock so paused-time tests can drive it.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// The duration to wait after the last event before triggering
    delay: Duration,
    /// When the last event occurred
    last_event: Option<Instant>,
    /// Whether we have a pending trigger
    pending: bool,
}

impl Debouncer {
    /// Create a new debouncer with the specified delay in milliseconds
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            last_event: None,
            pending: false,
        }
    }

    /// Register that an event occurred. A pending trigger is pushed back,
    /// so only the last event of a burst ever fires.
    pub fn trigger(&mut self) {
        self.last_event = Some(Instant::now());
        self.pending = true;
    }

    /// Check if enough time has passed to execute the debounced action.
    /// Returns true once per burst.
    pub fn should_execute(&mut self) -> bool {
        if !self.pending {
            return false;
        }

        if let Some(last) = self.last_event {
            if last.elapsed() >= self.delay {
                self.pending = false;
                self.last_event = None;
                return true;
            }
        }
        false
    }

    /// Get the time remaining before the action will trigger
    /// Returns None if no action is pending
    pub fn time_remaining(&self) -> Option<Duration> {
        if !self.pending {
            return None;
        }

        self.last_event
            .map(|last| self.delay.saturating_sub(last.elapsed()))
    }

    /// When the pending action becomes due
    pub fn deadline(&self) -> Option<Instant> {
        if !self.pending {
            return None;
        }
        self.last_event.map(|last| last + self.delay)
    }

    /// Reset the debouncer, canceling any pending action
    pub fn reset(&mut self) {
        self.last_event = None;
        self.pending = false;
    }
}
