// Library exports for the multiplexing core, its tests, and the CLI.
//
// # Ownership model
//
// The whole model (tabs, trees, sessions, snapshot state) is owned by a
// single `Mux` driven from one event loop. No locks protect it; collaborators
// talk to it over channels. `parking_lot::Mutex` appears only for the
// process-wide debug logger and in test fakes.

/// Crate version, for the CLI and the snapshot tooling.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod cli;
pub mod mux;
pub mod observer;
pub mod pane;
pub mod session;
pub mod tab;
pub mod traits;
pub mod workspace;

pub use par_mux_config::{Config, ConfigError, PaneId, ProjectId, TabId, TimingConfig};
pub use par_mux_shell as shell;
