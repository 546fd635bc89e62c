//! Shell integration marker decoding for par-mux.
//!
//! Observes a session's raw output stream and decodes the embedded
//! shell-integration escape sequences:
//!
//! - Command boundaries (OSC 133 / OSC 633): prompt-start, prompt-end,
//!   command-start, command-end with exit code
//! - Working directory reports (OSC 7 `file://` URIs, OSC 1337 `CurrentDir`)
//!
//! The channel is best-effort: malformed sequences are dropped and never
//! surface as errors.

pub mod integration;
pub mod marker;
pub mod osc;

pub use integration::{CommandRecord, InFlightCommand, ShellEvent, ShellIntegration};
pub use marker::{ShellMarker, parse_osc};
pub use osc::OscScanner;
