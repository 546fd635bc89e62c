//! Shared enums and identifiers for the split tree.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use par_mux_config::PaneId;
use par_mux_config::TabId;

/// Weights of a container's children always sum to this value.
pub const TOTAL_WEIGHT: f64 = 100.0;

/// Axis along which a container lays out its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    /// Children side by side, left to right
    Row,
    /// Children stacked, top to bottom
    Column,
}

impl SplitDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitDirection::Row => "row",
            SplitDirection::Column => "column",
        }
    }
}

/// Where a new pane goes relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Left of (row) or above (column) the target
    Before,
    /// Right of (row) or below (column) the target
    #[default]
    After,
}

/// Opaque handle of a live terminal session.
///
/// Session ids are never persisted; every restore allocates fresh ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out session ids of the form `tab{tab}-pane{pane}-{seq}`.
///
/// The sequence number makes ids unique across restarts of the same pane.
#[derive(Debug, Default)]
pub struct SessionIdAllocator {
    next_seq: u64,
}

impl SessionIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, tab_id: TabId, pane_id: PaneId) -> SessionId {
        let seq = self.next_seq;
        self.next_seq += 1;
        SessionId(format!("tab{tab_id}-pane{pane_id}-{seq}"))
    }
}
