//! Resize coalescing.
//!
//! Resize signals are collapsed with a trailing debounce. When the window
//! expires, a row-only change is forwarded immediately. A column change on
//! a session whose scrollback exceeds the reflow threshold is held for an
//! extra settle period (reflowing a large buffer is the expensive part),
//! while any row change in the same burst still goes out at once with the
//! previously applied column count.

use std::time::{Duration, Instant};

use par_mux_config::TimingConfig;

/// Per-session resize debouncer.
///
/// Callers feed signals with [`signal`](Self::signal) and call
/// [`poll`](Self::poll) from their timer loop; `poll` returns the dimensions
/// to forward to the host, if any.
#[derive(Debug, Clone)]
pub struct ResizeCoalescer {
    debounce: Duration,
    settle: Duration,
    reflow_threshold: usize,
    /// (cols, rows) last forwarded to the host
    applied: Option<(u16, u16)>,
    /// (cols, rows) from the most recent signal
    desired: Option<(u16, u16)>,
    debounce_deadline: Option<Instant>,
    /// Deadline of a held column change
    column_deadline: Option<Instant>,
}

impl ResizeCoalescer {
    pub fn new(timing: &TimingConfig) -> Self {
        Self::with_timing(
            timing.resize_debounce(),
            timing.column_reflow_settle(),
            timing.reflow_threshold_lines,
        )
    }

    pub fn with_timing(debounce: Duration, settle: Duration, reflow_threshold: usize) -> Self {
        Self {
            debounce,
            settle,
            reflow_threshold,
            applied: None,
            desired: None,
            debounce_deadline: None,
            column_deadline: None,
        }
    }

    /// Record dimensions the host already has (e.g. from session creation)
    /// and drop anything pending.
    pub fn reset_to(&mut self, cols: u16, rows: u16) {
        self.applied = Some((cols, rows));
        self.desired = Some((cols, rows));
        self.cancel();
    }

    /// Dimensions last forwarded to the host
    pub fn applied(&self) -> Option<(u16, u16)> {
        self.applied
    }

    /// Whether a column change is currently being held
    pub fn is_holding_columns(&self) -> bool {
        self.column_deadline.is_some()
    }

    /// Register a resize signal; restarts the debounce window.
    pub fn signal(&mut self, cols: u16, rows: u16, now: Instant) {
        self.desired = Some((cols, rows));
        self.debounce_deadline = Some(now + self.debounce);
    }

    /// Cancel pending timers without forgetting the applied size
    pub fn cancel(&mut self) {
        self.debounce_deadline = None;
        self.column_deadline = None;
    }

    /// Earliest instant at which `poll` may produce a resize
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debounce_deadline, self.column_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Advance timers to `now`. Returns the (cols, rows) to forward.
    pub fn poll(&mut self, now: Instant, scrollback_lines: usize) -> Option<(u16, u16)> {
        let desired = self.desired?;

        let mut forward = None;
        if let Some(deadline) = self.debounce_deadline
            && now >= deadline
        {
            self.debounce_deadline = None;
            forward = self.on_window_expired(desired, now, scrollback_lines);
        } else if let Some(deadline) = self.column_deadline
            && self.debounce_deadline.is_none()
            && now >= deadline
        {
            self.column_deadline = None;
            forward = Some(desired);
        }

        let forward = forward.filter(|dims| Some(*dims) != self.applied)?;
        self.applied = Some(forward);
        Some(forward)
    }

    fn on_window_expired(
        &mut self,
        desired: (u16, u16),
        now: Instant,
        scrollback_lines: usize,
    ) -> Option<(u16, u16)> {
        let Some((applied_cols, applied_rows)) = self.applied else {
            return Some(desired);
        };
        let (cols, rows) = desired;

        if cols == applied_cols {
            // Row-only change, or back to the applied width
            self.column_deadline = None;
            return (rows != applied_rows).then_some((applied_cols, rows));
        }

        if scrollback_lines > self.reflow_threshold {
            log::trace!(
                "Holding column change {} -> {} ({} lines of scrollback)",
                applied_cols,
                cols,
                scrollback_lines
            );
            self.column_deadline = Some(now + self.settle);
            return (rows != applied_rows).then_some((applied_cols, rows));
        }

        self.column_deadline = None;
        Some(desired)
    }
}
