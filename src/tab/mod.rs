//! Tabs: a title, an optional project association, and a pane tree.
//!
//! Terminal tabs own a split tree; other tab kinds (editors, dashboards
//! hosted by the surrounding application) are carried through snapshots
//! untouched and have no tree.

mod manager;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use manager::TabManager;
pub use par_mux_config::{ProjectId, TabId};

use crate::pane::{Pane, PaneId, PaneNode, changed_pane_ids, directory_label};

/// What a tab hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabKind {
    #[default]
    Terminal,
    /// Any tab type this crate does not manage
    #[serde(other)]
    Other,
}

/// A single workspace tab
#[derive(Debug, Clone)]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    pub kind: TabKind,
    pub project_id: Option<ProjectId>,
    /// Split tree; `None` for non-terminal tabs
    pub tree: Option<PaneNode>,
    pub active_pane_id: Option<PaneId>,
    /// Title was set by the user and no longer follows the working directory
    pub user_titled: bool,
}

impl Tab {
    /// Create a terminal tab holding a single pane
    pub fn new_terminal(id: TabId, pane: Pane) -> Self {
        Self::with_root(id, PaneNode::leaf(pane))
    }

    /// Create a terminal tab around an existing tree, focusing its first pane
    pub fn with_root(id: TabId, root: PaneNode) -> Self {
        let active = root.first_pane().map(|p| p.id);
        let mut tab = Self {
            id,
            title: String::new(),
            kind: TabKind::Terminal,
            project_id: None,
            tree: Some(root),
            active_pane_id: active,
            user_titled: false,
        };
        tab.refresh_title();
        tab
    }

    /// Create a tab of a kind this crate does not manage
    pub fn new_other(id: TabId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            kind: TabKind::Other,
            project_id: None,
            tree: None,
            active_pane_id: None,
            user_titled: true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == TabKind::Terminal
    }

    pub fn pane_count(&self) -> usize {
        self.tree.as_ref().map_or(0, PaneNode::pane_count)
    }

    pub fn contains_pane(&self, pane_id: PaneId) -> bool {
        self.tree.as_ref().is_some_and(|t| t.contains_pane(pane_id))
    }

    pub fn active_pane(&self) -> Option<&Arc<Pane>> {
        let tree = self.tree.as_ref()?;
        self.active_pane_id.and_then(|id| tree.find_pane(id))
    }

    /// Replace the tree. Returns the ids of panes whose leaves changed.
    ///
    /// The active pane falls back to the first leaf if it left the tree.
    pub fn set_tree(&mut self, tree: Option<PaneNode>) -> Vec<PaneId> {
        let changed = changed_pane_ids(self.tree.as_ref(), tree.as_ref());
        self.tree = tree;

        let active_valid = self.active_pane_id.is_some_and(|id| self.contains_pane(id));
        if !active_valid {
            self.active_pane_id = self
                .tree
                .as_ref()
                .and_then(PaneNode::first_pane)
                .map(|p| p.id);
        }
        self.refresh_title();
        changed
    }

    /// Focus a pane. Returns false if the pane is not in this tab.
    pub fn set_active_pane(&mut self, pane_id: PaneId) -> bool {
        if !self.contains_pane(pane_id) {
            return false;
        }
        self.active_pane_id = Some(pane_id);
        self.refresh_title();
        true
    }

    /// Set a user title; it sticks until [`clear_user_title`](Self::clear_user_title).
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.user_titled = true;
    }

    pub fn clear_user_title(&mut self) {
        self.user_titled = false;
        self.refresh_title();
    }

    /// Derive the title from the active pane's working directory unless the
    /// user named the tab. Returns true if the title changed.
    pub fn refresh_title(&mut self) -> bool {
        if self.user_titled || !self.is_terminal() {
            return false;
        }
        let title = self
            .active_pane()
            .and_then(|pane| {
                pane.custom_label
                    .clone()
                    .or_else(|| pane.working_directory.as_deref().and_then(directory_label))
            })
            .unwrap_or_else(|| "Terminal".to_string());
        if title == self.title {
            return false;
        }
        self.title = title;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::{SessionId, SplitDirection, insert_split, remove_pane};

    fn pane(id: PaneId, cwd: &str) -> Pane {
        Pane::new(id, SessionId::new(format!("s{id}")), Some(cwd.to_string()))
    }

    #[test]
    fn test_title_follows_active_pane_cwd() {
        let mut tab = Tab::new_terminal(1, pane(1, "/home/me/api"));
        assert_eq!(tab.title, "api");

        let tree = insert_split(tab.tree.as_ref().unwrap(), 1, pane(2, "/srv/web"), SplitDirection::Row);
        assert_eq!(tab.set_tree(Some(tree)), vec![2]);
        assert_eq!(tab.title, "api");

        assert!(tab.set_active_pane(2));
        assert_eq!(tab.title, "web");
        assert!(!tab.set_active_pane(9));
    }

    #[test]
    fn test_user_title_sticks() {
        let mut tab = Tab::new_terminal(1, pane(1, "/tmp"));
        tab.set_title("build");
        assert!(!tab.refresh_title());
        assert_eq!(tab.title, "build");

        tab.clear_user_title();
        assert_eq!(tab.title, "tmp");
    }

    #[test]
    fn test_active_pane_falls_back_when_removed() {
        let mut tab = Tab::new_terminal(1, pane(1, "/a"));
        let tree = insert_split(tab.tree.as_ref().unwrap(), 1, pane(2, "/b"), SplitDirection::Row);
        tab.set_tree(Some(tree));
        tab.set_active_pane(2);

        let tree = remove_pane(tab.tree.as_ref().unwrap(), 2);
        tab.set_tree(tree);
        assert_eq!(tab.active_pane_id, Some(1));
        assert_eq!(tab.title, "a");
    }

    #[test]
    fn test_other_tab_kind_deserializes_unknown_types() {
        let kind: TabKind = serde_json::from_str("\"browser\"").unwrap();
        assert_eq!(kind, TabKind::Other);
        let kind: TabKind = serde_json::from_str("\"terminal\"").unwrap();
        assert_eq!(kind, TabKind::Terminal);
        assert_eq!(Tab::new_other(3, "Docs").pane_count(), 0);
    }
}
