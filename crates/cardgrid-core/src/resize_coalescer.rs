#![forbid(unsafe_code)]

//! Coalescing for container-width changes.
//!
//! A drag-resize produces a flood of width notifications. Repacking on each
//! one is wasted work: only the width the container settles on matters.
//! [`ResizeCoalescer`] keeps the latest pending width and releases it once
//! no newer width has arrived for a quiet window.
//!
//! # Design
//!
//! - **Latest wins**: each [`push`](ResizeCoalescer::push) replaces the
//!   pending width and restarts the quiet window.
//! - **Explicit time**: callers pass `now`, so the coalescer holds no clock
//!   and tests are deterministic.
//! - **No-op suppression**: a settled width equal to the last applied width
//!   is swallowed.
//!
//! ```
//! use cardgrid_core::resize_coalescer::ResizeCoalescer;
//! use std::time::Duration;
//! use web_time::Instant;
//!
//! let t0 = Instant::now();
//! let mut rc = ResizeCoalescer::new(Duration::from_millis(100));
//! rc.push(1900.0, t0);
//! rc.push(1200.0, t0 + Duration::from_millis(10));
//! assert_eq!(rc.poll(t0 + Duration::from_millis(50)), None);
//! assert_eq!(rc.poll(t0 + Duration::from_millis(120)), Some(1200.0));
//! ```

use std::time::Duration;

use web_time::Instant;

/// Default quiet window before a pending width is released.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
struct PendingWidth {
    width: f64,
    last_push: Instant,
}

/// Debounces container-width notifications.
///
/// Not thread-safe; owned by the single event loop that drives a card.
#[derive(Debug, Clone)]
pub struct ResizeCoalescer {
    quiet: Duration,
    pending: Option<PendingWidth>,
    applied: Option<f64>,
    coalesced: u64,
}

impl Default for ResizeCoalescer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_WINDOW)
    }
}

impl ResizeCoalescer {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            applied: None,
            coalesced: 0,
        }
    }

    /// Record a new width observation.
    pub fn push(&mut self, width: f64, now: Instant) {
        if self.pending.is_some() {
            self.coalesced = self.coalesced.saturating_add(1);
        }
        self.pending = Some(PendingWidth {
            width,
            last_push: now,
        });
    }

    /// Release the pending width if the quiet window has elapsed.
    ///
    /// Returns `None` while the window is open, when nothing is pending, or
    /// when the settled width equals the last released width.
    pub fn poll(&mut self, now: Instant) -> Option<f64> {
        let pending = self.pending?;
        if now.saturating_duration_since(pending.last_push) < self.quiet {
            return None;
        }
        self.pending = None;
        self.apply(pending.width)
    }

    /// Release any pending width immediately, ignoring the quiet window.
    pub fn flush(&mut self) -> Option<f64> {
        let pending = self.pending.take()?;
        self.apply(pending.width)
    }

    /// Record a width the owner applied without going through the
    /// coalescer. Drops any pending width.
    pub fn mark_applied(&mut self, width: f64) {
        self.pending = None;
        self.applied = Some(width);
    }

    fn apply(&mut self, width: f64) -> Option<f64> {
        if self.applied == Some(width) {
            return None;
        }
        self.applied = Some(width);
        Some(width)
    }

    /// Whether a width is waiting for its quiet window.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Last width released by `poll` or `flush`, or recorded by `mark_applied`.
    #[must_use]
    pub fn applied(&self) -> Option<f64> {
        self.applied
    }

    /// Number of pushes that replaced a still-pending width.
    #[must_use]
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced
    }

    #[must_use]
    pub fn quiet_window(&self) -> Duration {
        self.quiet
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn empty_poll_is_none() {
        let mut rc = ResizeCoalescer::default();
        assert_eq!(rc.poll(Instant::now()), None);
        assert_eq!(rc.flush(), None);
    }

    #[test]
    fn latest_width_wins() {
        let t0 = Instant::now();
        let mut rc = ResizeCoalescer::new(ms(100));
        for (i, w) in [1900.0, 1500.0, 900.0, 375.0].into_iter().enumerate() {
            rc.push(w, t0 + ms(i as u64 * 5));
        }
        assert_eq!(rc.coalesced_count(), 3);
        assert_eq!(rc.poll(t0 + ms(60)), None);
        assert!(rc.has_pending());
        assert_eq!(rc.poll(t0 + ms(200)), Some(375.0));
        assert!(!rc.has_pending());
    }

    #[test]
    fn push_restarts_window() {
        let t0 = Instant::now();
        let mut rc = ResizeCoalescer::new(ms(100));
        rc.push(800.0, t0);
        rc.push(700.0, t0 + ms(90));
        assert_eq!(rc.poll(t0 + ms(150)), None);
        assert_eq!(rc.poll(t0 + ms(190)), Some(700.0));
    }

    #[test]
    fn unchanged_width_is_suppressed() {
        let t0 = Instant::now();
        let mut rc = ResizeCoalescer::new(ms(10));
        rc.push(1280.0, t0);
        assert_eq!(rc.flush(), Some(1280.0));
        rc.push(1280.0, t0 + ms(5));
        assert_eq!(rc.poll(t0 + ms(50)), None);
        assert_eq!(rc.applied(), Some(1280.0));
    }

    #[test]
    fn direct_apply_does_not_swallow_return_width() {
        let t0 = Instant::now();
        let mut rc = ResizeCoalescer::new(ms(10));
        rc.push(800.0, t0);
        assert_eq!(rc.poll(t0 + ms(20)), Some(800.0));

        rc.push(1000.0, t0 + ms(30));
        rc.mark_applied(1200.0);
        assert!(!rc.has_pending());
        assert_eq!(rc.applied(), Some(1200.0));

        rc.push(800.0, t0 + ms(40));
        assert_eq!(rc.poll(t0 + ms(60)), Some(800.0));
    }
}
