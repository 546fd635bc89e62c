//! Configuration system for the par-mux terminal multiplexing core.
//!
//! This crate provides configuration loading, saving, and default values
//! shared by the workspace crates. It includes:
//!
//! - Timing constants for resize coalescing, snapshot debouncing and exit grace
//! - Shell integration settings (history bound, on/off switch)
//! - Shared identifier types (`PaneId`, `TabId`, `ProjectId`)
//! - Typed configuration errors

pub mod config;
pub mod defaults;
pub mod error;
mod types;

// Re-export main types for convenience
pub use config::{Config, ShellIntegrationConfig, TimingConfig};
pub use error::ConfigError;
pub use types::{PaneId, ProjectId, TabId};
