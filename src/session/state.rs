//! Lifecycle states and the read-only session view.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::pane::{PaneId, SessionId};

/// Lifecycle state of a pane's session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Pane exists but no surface has been mounted yet
    Unbound,
    /// Surface mounted; waiting for working directory and size
    Pending,
    /// Creation requested; waiting for the host to acknowledge
    Created,
    /// Live: output streams, input is accepted
    Active,
    /// Process exited or creation failed
    Exited,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Unbound => "unbound",
            SessionState::Pending => "pending",
            SessionState::Created => "created",
            SessionState::Active => "active",
            SessionState::Exited => "exited",
        }
    }

    /// Whether the host holds a live process for this state
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Created | SessionState::Active)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shell-integration state as seen by status indicators
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellSummary {
    pub cwd: Option<String>,
    pub host: Option<String>,
    pub last_exit_code: Option<i32>,
    pub command_running: bool,
    pub history_len: usize,
}

/// Snapshot of one pane's session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub pane_id: PaneId,
    pub session_id: SessionId,
    pub state: SessionState,
    /// Dimensions last sent to the host, as (cols, rows)
    pub size: Option<(u16, u16)>,
    pub working_directory: Option<String>,
    pub last_exit_code: Option<i32>,
    /// Creation failure message, if creation failed
    pub failure: Option<String>,
    /// Whether the host had retained output to replay on the last creation
    pub replay_available: bool,
    /// Bytes received but not yet applied and acknowledged
    pub unacked_bytes: usize,
    /// Last output applied or input forwarded
    pub last_activity: Option<DateTime<Utc>>,
    pub shell: ShellSummary,
}

/// Errors returned by [`super::SessionManager`] operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session registered for pane {0}")]
    UnknownPane(PaneId),

    #[error("pane {pane_id} session is {state}, expected {expected}")]
    InvalidState {
        pane_id: PaneId,
        state: SessionState,
        expected: &'static str,
    },

    #[error("session host request failed: {0}")]
    Host(#[from] anyhow::Error),
}
