//! Contracts between the multiplexing core and its external collaborators.
//!
//! The core never spawns processes, draws pixels, or touches the settings
//! backend directly. These traits are the seams; the binary and the tests
//! provide concrete implementations.

use anyhow::Result;

use crate::pane::SessionId;

/// Parameters of a session creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionRequest {
    pub session_id: SessionId,
    pub cwd: String,
    pub cols: u16,
    pub rows: u16,
}

// ── SessionHost ──────────────────────────────────────────────────────────────

/// The process-hosting collaborator.
///
/// Calls are fire-and-forget requests; outcomes come back asynchronously as
/// [`crate::session::HostEvent`]s. An `Err` means the request could not be
/// issued at all.
pub trait SessionHost {
    /// Create a session, or reconnect to it if the id is already alive.
    ///
    /// The host answers with `HostEvent::Created`, carrying the retained
    /// output buffer when it reconnected. That buffer holds every byte the
    /// core has not acknowledged; the core acknowledges its full length once
    /// it is applied, so flow-control credit carries across the reconnect
    /// without a reset.
    fn create_session(&mut self, request: CreateSessionRequest) -> Result<()>;

    /// Forward user input
    fn write_session(&mut self, session_id: &SessionId, data: &[u8]) -> Result<()>;

    /// Change the terminal geometry of a session
    fn resize_session(&mut self, session_id: &SessionId, cols: u16, rows: u16) -> Result<()>;

    /// Report that `bytes` of output have been fully applied.
    ///
    /// This is the only signal that lets the host read further output.
    fn ack_output(&mut self, session_id: &SessionId, bytes: usize);

    /// Release the session handle
    fn close_session(&mut self, session_id: &SessionId);
}

// ── PaneSurface ──────────────────────────────────────────────────────────────

/// The rendering surface a session's output is applied to.
pub trait PaneSurface: Send {
    /// Apply a chunk of raw output to the surface's buffer
    fn apply_output(&mut self, data: &[u8]);

    /// Absolute line index of the cursor (scrollback included)
    fn cursor_line(&self) -> usize;

    /// Number of lines currently held in scrollback
    fn scrollback_lines(&self) -> usize;
}

// ── SettingsStore ────────────────────────────────────────────────────────────

/// The persistence collaborator: a flat string key/value store.
pub trait SettingsStore {
    fn read_setting(&self, key: &str) -> Result<Option<String>>;

    fn write_setting(&mut self, key: &str, value: &str) -> Result<()>;
}
