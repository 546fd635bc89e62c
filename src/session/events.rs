//! Events flowing into and out of the session manager.

use chrono::{DateTime, Utc};
use par_mux_config::TabId;
use par_mux_shell::ShellEvent;

use crate::pane::{PaneId, SessionId};

/// Inbound notification from the session host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A creation request completed. `replay` carries retained output when
    /// the host reconnected to a session that was already alive.
    Created {
        session_id: SessionId,
        replay: Option<Vec<u8>>,
    },
    /// A creation request failed on the host side
    CreateFailed { session_id: SessionId, message: String },
    /// A chunk of output; must be acknowledged once applied
    Output { session_id: SessionId, data: Vec<u8> },
    /// The backing process exited
    Exited {
        session_id: SessionId,
        exit_code: Option<i32>,
    },
}

impl HostEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            HostEvent::Created { session_id, .. }
            | HostEvent::CreateFailed { session_id, .. }
            | HostEvent::Output { session_id, .. }
            | HostEvent::Exited { session_id, .. } => session_id,
        }
    }
}

/// Outbound notification for the owner of the session manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The host acknowledged creation and output is streaming
    Activated { pane_id: PaneId, replayed: bool },
    /// Shell integration reported a new working directory
    CwdChanged { pane_id: PaneId, cwd: String },
    /// The session ended. `restartable` panes offer a restart affordance.
    Exited {
        pane_id: PaneId,
        exit_code: Option<i32>,
        failure: Option<String>,
        restartable: bool,
    },
    /// The exit grace period elapsed; the pane should be removed
    RemovalDue { pane_id: PaneId, tab_id: TabId },
    /// Output was applied or input forwarded. Throttled per pane.
    Activity { pane_id: PaneId, at: DateTime<Utc> },
}

/// Shell-integration notification delivered to per-pane subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct PaneShellEvent {
    pub pane_id: PaneId,
    pub event: ShellEvent,
}
