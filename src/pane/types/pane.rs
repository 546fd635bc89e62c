//! `Pane`: leaf payload of the split tree.

use chrono::{DateTime, Utc};

use super::common::{PaneId, SessionId};

/// A single terminal pane.
///
/// Panes are immutable once placed in a tree; edits go through
/// [`crate::pane::update_pane`], which swaps in a new `Arc<Pane>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pane {
    /// Unique identifier within the workspace
    pub id: PaneId,
    /// Live session handle; never persisted
    pub session_id: SessionId,
    /// Last known working directory
    pub working_directory: Option<String>,
    /// Name of the foreground process, as reported by the host
    pub process_name: Option<String>,
    /// User-chosen label, overrides any derived title
    pub custom_label: Option<String>,
    /// Last output or input seen by the pane's session; never persisted
    pub last_activity: Option<DateTime<Utc>>,
}

impl Pane {
    /// Create a pane with no metadata beyond its working directory
    pub fn new(id: PaneId, session_id: SessionId, working_directory: Option<String>) -> Self {
        Self {
            id,
            session_id,
            working_directory,
            process_name: None,
            custom_label: None,
            last_activity: None,
        }
    }

    /// Label shown in pane headers: custom label, then process, then
    /// the last path component of the working directory.
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.custom_label {
            return label.clone();
        }
        if let Some(process) = &self.process_name {
            return process.clone();
        }
        self.working_directory
            .as_deref()
            .and_then(directory_label)
            .unwrap_or_else(|| format!("Pane {}", self.id))
    }
}

/// Last non-empty component of a path, or `/` for the root.
pub(crate) fn directory_label(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return (!path.is_empty()).then(|| "/".to_string());
    }
    trimmed.rsplit('/').next().map(str::to_string)
}
