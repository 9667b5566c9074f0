//! Time-based scheduling primitives.
//!
//! Both types are passive: the host passes the current [`Instant`] into every
//! call and polls for due work, so behavior is deterministic in tests.
//!
//! - [`Debouncer`] holds one pending value and fires it once no new value has
//!   arrived for `delay`. Latest wins.
//! - [`FrameScheduler`] coalesces any number of frame requests into a single
//!   pending frame.

use std::time::{Duration, Instant};

/// Trailing-edge debouncer holding at most one pending value.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Create an idle debouncer.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Debounce delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value`, replacing any pending value and restarting the timer.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Pending value, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(v, _)| v)
    }

    /// When the pending value fires.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Time left until the pending value fires.
    #[must_use]
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline().map(|at| at.saturating_duration_since(now))
    }

    /// Take the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((_, at)) if at <= now => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    /// Drop the pending value.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(v, _)| v)
    }
}

/// Coalesces frame requests so at most one frame is pending.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameScheduler {
    requested_at: Option<Instant>,
    frames: u64,
}

impl FrameScheduler {
    /// Create an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a frame. A newer request replaces a pending one.
    pub fn request(&mut self, now: Instant) {
        self.requested_at = Some(now);
    }

    /// Whether a frame is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.requested_at.is_some()
    }

    /// Consume the pending frame, returning when it was last requested.
    pub fn take(&mut self) -> Option<Instant> {
        let at = self.requested_at.take()?;
        self.frames += 1;
        Some(at)
    }

    /// Drop the pending frame.
    pub fn cancel(&mut self) {
        self.requested_at = None;
    }

    /// Frames consumed so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
