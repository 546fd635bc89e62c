//! The `Config` struct and its YAML persistence.
//!
//! Config lives at `<config_dir>/par-mux/config.yaml`. A missing file yields
//! defaults; saving writes through a temp file and renames it into place.

use crate::defaults;
use crate::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for any timer value. Anything above this makes the UI feel hung.
const MAX_TIMER_MS: u64 = 10_000;

/// Timing constants for the session lifecycle and persistence loops.
///
/// These values are empirically tuned rather than derived; they are exposed
/// here so they can be adjusted against real terminal workloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Quiet period (ms) over which resize signals are coalesced
    #[serde(default = "defaults::resize_debounce_ms")]
    pub resize_debounce_ms: u64,

    /// Extra hold (ms) for column changes on sessions with a large scrollback
    #[serde(default = "defaults::column_reflow_settle_ms")]
    pub column_reflow_settle_ms: u64,

    /// Scrollback size (lines) above which a column change is held
    #[serde(default = "defaults::reflow_threshold_lines")]
    pub reflow_threshold_lines: usize,

    /// Delay (ms) between process exit and pane removal
    #[serde(default = "defaults::exit_grace_ms")]
    pub exit_grace_ms: u64,

    /// Trailing debounce (ms) for workspace snapshot writes
    #[serde(default = "defaults::snapshot_debounce_ms")]
    pub snapshot_debounce_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: defaults::resize_debounce_ms(),
            column_reflow_settle_ms: defaults::column_reflow_settle_ms(),
            reflow_threshold_lines: defaults::reflow_threshold_lines(),
            exit_grace_ms: defaults::exit_grace_ms(),
            snapshot_debounce_ms: defaults::snapshot_debounce_ms(),
        }
    }
}

impl TimingConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn column_reflow_settle(&self) -> Duration {
        Duration::from_millis(self.column_reflow_settle_ms)
    }

    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }

    pub fn snapshot_debounce(&self) -> Duration {
        Duration::from_millis(self.snapshot_debounce_ms)
    }
}

/// Shell integration (OSC 133 / OSC 7) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellIntegrationConfig {
    /// Decode command-boundary and working-directory markers
    #[serde(default = "defaults::bool_true")]
    pub enabled: bool,

    /// Maximum number of completed commands kept per session
    #[serde(default = "defaults::command_history_limit")]
    pub command_history_limit: usize,
}

impl Default for ShellIntegrationConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::bool_true(),
            command_history_limit: defaults::command_history_limit(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub shell_integration: ShellIntegrationConfig,

    /// Working directory used when a pane's directory cannot be resolved.
    /// `None` means the user's home directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_working_directory: Option<String>,
}

impl Config {
    /// Get the configuration directory (`<config_dir>/par-mux`)
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("par-mux")
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file
    ///
    /// Returns defaults if the file does not exist or is empty.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::from)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut config: Config = serde_yaml_ng::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::from)?;
        }

        let yaml = serde_yaml_ng::to_string(self).map_err(ConfigError::from)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(ConfigError::from)?;
        fs::rename(&temp_path, path).map_err(ConfigError::from)?;
        Ok(())
    }

    /// Check timer bounds and clamp values that have a safe minimum.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let timers = [
            ("resize_debounce_ms", self.timing.resize_debounce_ms),
            ("column_reflow_settle_ms", self.timing.column_reflow_settle_ms),
            ("exit_grace_ms", self.timing.exit_grace_ms),
            ("snapshot_debounce_ms", self.timing.snapshot_debounce_ms),
        ];
        for (name, value) in timers {
            if value > MAX_TIMER_MS {
                return Err(ConfigError::Validation(format!(
                    "timing.{name} = {value} exceeds the {MAX_TIMER_MS}ms limit"
                )));
            }
        }

        if self.shell_integration.command_history_limit == 0 {
            log::warn!("shell_integration.command_history_limit = 0, clamping to 1");
            self.shell_integration.command_history_limit = 1;
        }
        Ok(())
    }

    /// Resolve the directory new panes fall back to.
    pub fn default_working_directory(&self) -> String {
        if let Some(dir) = &self.default_working_directory
            && Path::new(dir).is_dir()
        {
            return dir.clone();
        }
        dirs::home_dir()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| "/".to_string())
    }
}
