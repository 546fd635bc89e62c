//! Command-line interface for par-mux.
//!
//! The binary is a maintenance tool around the persisted workspace: it can
//! print the stored snapshot, dry-run a restore, and emit the default config.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use par_mux_config::Config;

use crate::pane::SerializedNode;
use crate::tab::TabKind;
use crate::traits::SettingsStore;
use crate::workspace::{
    FileSettingsStore, ProjectRegistry, SNAPSHOT_KEY, WorkspaceSnapshot, restore_workspace,
};

/// par-mux - terminal multiplexing core
#[derive(Parser)]
#[command(name = "par-mux")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set debug log level (overrides RUST_LOG and DEBUG_LEVEL)
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect the persisted workspace snapshot
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum SnapshotAction {
    /// Print the tabs and pane trees of the stored snapshot
    Show {
        /// Settings file to read (defaults to the per-user settings file)
        #[arg(long, value_name = "PATH")]
        settings: Option<PathBuf>,
    },

    /// Restore the snapshot in memory and report every repair it needed
    Check {
        /// Settings file to read (defaults to the per-user settings file)
        #[arg(long, value_name = "PATH")]
        settings: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the default configuration as YAML
    Defaults,

    /// Print the configuration file location
    Path,
}

/// Parse arguments, initialise logging, run the subcommand.
/// Returns the process exit code.
pub fn process_cli() -> i32 {
    let cli = Cli::parse();
    crate::debug::init_log_bridge(cli.log_level.map(LogLevelArg::to_level_filter));

    let result = match cli.command {
        Commands::Snapshot { action } => match action {
            SnapshotAction::Show { settings } => snapshot_show(settings.as_deref()),
            SnapshotAction::Check { settings } => snapshot_check(settings.as_deref()),
        },
        Commands::Config { action } => match action {
            ConfigAction::Defaults => config_defaults(),
            ConfigAction::Path => {
                println!("{}", Config::config_path().display());
                Ok(0)
            }
        },
    };

    result.unwrap_or_else(|e| {
        eprintln!("par-mux: error: {e:#}");
        1
    })
}

fn open_store(settings: Option<&Path>) -> Result<FileSettingsStore> {
    match settings {
        Some(path) => FileSettingsStore::open(path),
        None => FileSettingsStore::open_default(),
    }
}

fn snapshot_show(settings: Option<&Path>) -> Result<i32> {
    let store = open_store(settings)?;
    let Some(json) = store.read_setting(SNAPSHOT_KEY)? else {
        println!("No workspace snapshot in {}", store.path().display());
        return Ok(0);
    };
    let snapshot = WorkspaceSnapshot::from_json(&json).context("Stored snapshot is invalid")?;
    print!("{}", describe_snapshot(&snapshot));
    Ok(0)
}

fn snapshot_check(settings: Option<&Path>) -> Result<i32> {
    let store = open_store(settings)?;
    let Some(json) = store.read_setting(SNAPSHOT_KEY)? else {
        println!("No workspace snapshot in {}", store.path().display());
        return Ok(0);
    };
    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config, using defaults: {:#}", e);
        Config::default()
    });

    // Projects whose directories still exist count as registered
    let mut projects = ProjectRegistry::new();
    if let Ok((snapshot, _)) = WorkspaceSnapshot::from_json_lenient(&json) {
        for path in snapshot.project_paths.values() {
            if Path::new(path).is_dir() {
                projects.register(path);
            }
        }
    }

    let restored = restore_workspace(
        Some(&json),
        projects,
        Some(config.default_working_directory()),
    );
    let tabs = restored.workspace.tabs();
    let panes: usize = tabs.tabs().iter().map(|t| t.pane_count()).sum();
    println!("Restored {} tab(s), {} pane(s)", tabs.tab_count(), panes);

    if restored.warnings.is_empty() {
        println!("Snapshot is clean");
        return Ok(0);
    }
    for warning in &restored.warnings {
        println!("warning: {warning}");
    }
    Ok(1)
}

fn config_defaults() -> Result<i32> {
    let yaml = serde_yaml_ng::to_string(&Config::default())
        .context("Failed to serialize default config")?;
    print!("{yaml}");
    Ok(0)
}

/// Human-readable outline of a snapshot
pub fn describe_snapshot(snapshot: &WorkspaceSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Snapshot v{} saved {}",
        snapshot.version,
        snapshot.saved_at.as_deref().unwrap_or("(unknown)")
    );

    for tab in &snapshot.tabs {
        let kind = match tab.kind {
            TabKind::Terminal => "terminal",
            TabKind::Other => "other",
        };
        let active = if snapshot.active_tab_id == Some(tab.id) {
            " *"
        } else {
            ""
        };
        let _ = writeln!(out, "Tab {} \"{}\" [{}]{}", tab.id, tab.title, kind, active);
        if let Some(path) = tab
            .project_id
            .as_ref()
            .and_then(|id| snapshot.project_paths.get(id))
        {
            let _ = writeln!(out, "  project {path}");
        }
        if let Some(tree) = snapshot.per_tab_tree.get(&tab.id) {
            describe_node(&tree.root, tree.active_pane_id, 1, &mut out);
        }
    }
    out
}

fn describe_node(node: &SerializedNode, active: Option<u64>, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match node {
        SerializedNode::Pane {
            id,
            cwd,
            custom_label,
        } => {
            let marker = if active == Some(*id) { " *" } else { "" };
            let _ = write!(out, "{indent}pane {id}");
            if let Some(label) = custom_label {
                let _ = write!(out, " \"{label}\"");
            }
            let _ = writeln!(out, " {}{}", cwd.as_deref().unwrap_or("-"), marker);
        }
        SerializedNode::Split {
            direction,
            children,
            sizes,
        } => {
            let sizes: Vec<String> = sizes.iter().map(|s| format!("{s:.1}")).collect();
            let _ = writeln!(
                out,
                "{indent}split {} [{}]",
                direction.as_str(),
                sizes.join(", ")
            );
            for child in children {
                describe_node(child, active, depth + 1, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_snapshot_outline() {
        let json = r#"{
            "version": 1,
            "savedAt": "2026-01-01T00:00:00Z",
            "tabs": [{"id": 1, "type": "terminal", "title": "src"},
                     {"id": 2, "type": "notes", "title": "Notes"}],
            "activeTabId": 1,
            "perTabTree": {"1": {"root": {"type": "split", "direction": "row",
                "children": [{"type": "pane", "id": 1, "cwd": "/src"},
                             {"type": "pane", "id": 2, "customLabel": "logs"}],
                "sizes": [60, 40]}, "activePaneId": 2}}
        }"#;
        let snapshot = WorkspaceSnapshot::from_json(json).unwrap();
        let text = describe_snapshot(&snapshot);

        let expected = "Snapshot v1 saved 2026-01-01T00:00:00Z\n\
                        Tab 1 \"src\" [terminal] *\n\
                        \x20 split row [60.0, 40.0]\n\
                        \x20   pane 1 /src\n\
                        \x20   pane 2 \"logs\" - *\n\
                        Tab 2 \"Notes\" [other]\n";
        assert_eq!(text, expected);
    }
}
