//! Persisted workspace snapshot.
//!
//! The snapshot is a projection of the workspace with every runtime field
//! stripped: no session ids, no process metadata, no sizes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::pane::{PaneId, SerializedNode};
use crate::tab::{ProjectId, TabId, TabKind};

/// Settings key the snapshot is stored under
pub const SNAPSHOT_KEY: &str = "workspace.snapshot";

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot is not a JSON object")]
    NotAnObject,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// Tab entry of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTab {
    pub id: TabId,
    #[serde(rename = "type", default)]
    pub kind: TabKind,
    #[serde(default)]
    pub title: String,
    /// Title was chosen by the user
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub user_titled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

/// Pane tree of one terminal tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTree {
    pub root: SerializedNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_pane_id: Option<PaneId>,
}

/// Serializable projection of the whole workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    /// RFC 3339 timestamp of the capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub tabs: Vec<SnapshotTab>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab_id: Option<TabId>,
    #[serde(default)]
    pub per_tab_tree: BTreeMap<TabId, SnapshotTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_project_id: Option<ProjectId>,
    /// Project id (as of the capturing run) to project path
    #[serde(default)]
    pub project_paths: BTreeMap<ProjectId, String>,
}

impl Default for WorkspaceSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: None,
            tabs: Vec::new(),
            active_tab_id: None,
            per_tab_tree: BTreeMap::new(),
            active_project_id: None,
            project_paths: BTreeMap::new(),
        }
    }
}

impl WorkspaceSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Strict parse: any invalid part fails the whole snapshot
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    /// Lenient parse: tabs and trees that fail to decode are skipped and
    /// reported as warnings. Fails only if the document itself is unusable.
    pub fn from_json_lenient(json: &str) -> Result<(Self, Vec<String>), SnapshotError> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Object(mut fields) = value else {
            return Err(SnapshotError::NotAnObject);
        };

        let version = fields
            .get("version")
            .and_then(Value::as_u64)
            .map_or(SNAPSHOT_VERSION, |v| u32::try_from(v).unwrap_or(u32::MAX));
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        let mut warnings = Vec::new();
        let mut snapshot = WorkspaceSnapshot {
            saved_at: take_field(&mut fields, "savedAt", &mut warnings),
            active_tab_id: take_field(&mut fields, "activeTabId", &mut warnings),
            active_project_id: take_field(&mut fields, "activeProjectId", &mut warnings),
            project_paths: take_field(&mut fields, "projectPaths", &mut warnings)
                .unwrap_or_default(),
            ..Self::default()
        };

        if let Some(Value::Array(tabs)) = fields.remove("tabs") {
            for (index, raw) in tabs.into_iter().enumerate() {
                match serde_json::from_value::<SnapshotTab>(raw) {
                    Ok(tab) => snapshot.tabs.push(tab),
                    Err(e) => warnings.push(format!("dropping tab #{index}: {e}")),
                }
            }
        }

        if let Some(Value::Object(trees)) = fields.remove("perTabTree") {
            for (key, raw) in trees {
                let Ok(tab_id) = key.parse::<TabId>() else {
                    warnings.push(format!("ignoring tree with non-numeric tab id {key:?}"));
                    continue;
                };
                match serde_json::from_value::<SnapshotTree>(raw) {
                    Ok(tree) => {
                        snapshot.per_tab_tree.insert(tab_id, tree);
                    }
                    Err(e) => warnings.push(format!("dropping tree of tab {tab_id}: {e}")),
                }
            }
        }

        Ok((snapshot, warnings))
    }
}

fn take_field<T: serde::de::DeserializeOwned>(
    fields: &mut serde_json::Map<String, Value>,
    key: &str,
    warnings: &mut Vec<String>,
) -> Option<T> {
    let raw = fields.remove(key)?;
    if raw.is_null() {
        return None;
    }
    match serde_json::from_value(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warnings.push(format!("ignoring {key}: {e}"));
            None
        }
    }
}
