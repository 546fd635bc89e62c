//! Per-pane session lifecycle.
//!
//! Each pane is bound to one backing shell session, driven through
//! `Unbound → Pending → Created → Active → Exited`:
//! - creation waits for both a resolved working directory and a nonzero
//!   surface size
//! - resize signals are coalesced, and column changes on large buffers
//!   are held until the layout settles
//! - output is applied in order and acknowledged per chunk, which is the
//!   host's only permission to read more
//! - exit surfaces a restart affordance and, after a grace period, asks
//!   the caller to remove the pane

mod events;
mod manager;
mod output;
mod resize;
mod state;

pub use events::{HostEvent, PaneShellEvent, SessionEvent};
pub use manager::SessionManager;
pub use output::OutputQueue;
pub use resize::ResizeCoalescer;
pub use state::{SessionError, SessionInfo, SessionState, ShellSummary};
