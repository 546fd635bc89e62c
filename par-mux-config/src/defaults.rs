//! Default value functions for configuration.
//!
//! Used as `#[serde(default = "crate::defaults::...")]` attributes so that a
//! partially written config file still yields sane values.

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_true() -> bool {
    true
}

// ── Session timing ─────────────────────────────────────────────────────────

/// Quiet period over which individual resize signals are coalesced.
pub fn resize_debounce_ms() -> u64 {
    80
}

/// Extra hold applied to column changes on sessions with a large scrollback.
pub fn column_reflow_settle_ms() -> u64 {
    100
}

/// Scrollback size (lines) above which a column change counts as an expensive reflow.
pub fn reflow_threshold_lines() -> usize {
    1000
}

/// Delay between the backing process exiting and the pane being removed.
pub fn exit_grace_ms() -> u64 {
    1500
}

// ── Persistence ────────────────────────────────────────────────────────────

/// Trailing debounce for workspace snapshot writes.
pub fn snapshot_debounce_ms() -> u64 {
    300
}

// ── Shell integration ──────────────────────────────────────────────────────

pub fn command_history_limit() -> usize {
    200
}
