//! The workspace: tabs, their pane trees, project associations, and the
//! snapshot that persists them across restarts.
//!
//! Sub-modules:
//! - [`capture`]: workspace → [`WorkspaceSnapshot`]
//! - [`restore`]: snapshot → workspace, best-effort
//! - [`persist`]: debounced snapshot writes
//! - [`project`]: per-run project ids
//! - [`snapshot`]: persisted types
//! - [`storage`]: settings stores

pub mod capture;
pub mod persist;
pub mod project;
pub mod restore;
pub mod snapshot;
pub mod storage;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use capture::capture_workspace;
pub use persist::SnapshotScheduler;
pub use project::{Project, ProjectRegistry};
pub use restore::{RestoredWorkspace, restore_workspace};
pub use snapshot::{SNAPSHOT_KEY, SnapshotError, SnapshotTab, SnapshotTree, WorkspaceSnapshot};
pub use storage::{FileSettingsStore, MemorySettingsStore};

use crate::observer::{ObserverList, SubscriptionId};
use crate::pane::{
    self, Pane, PaneId, PaneNode, Placement, SessionId, SessionIdAllocator, SplitDirection,
};
use crate::tab::{ProjectId, Tab, TabId, TabManager};

/// Notification sent whenever a tab's tree is replaced
#[derive(Debug, Clone)]
pub struct TreeChange {
    pub tab_id: TabId,
    /// New root; `None` when the tab closed
    pub tree: Option<PaneNode>,
    /// Panes added, removed, or replaced
    pub changed_panes: Vec<PaneId>,
}

/// Outcome of removing a pane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneRemoval {
    /// The pane was removed and the tab still has panes
    Removed,
    /// The pane was the tab's last; the caller should close the tab
    TabEmptied,
}

/// Tabs, trees, and id allocation for one workspace
#[derive(Debug)]
pub struct Workspace {
    tabs: TabManager,
    projects: ProjectRegistry,
    active_project_id: Option<ProjectId>,
    session_ids: SessionIdAllocator,
    next_pane_id: PaneId,
    tree_observers: ObserverList<TreeChange>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(ProjectRegistry::new())
    }
}

impl Workspace {
    pub fn new(projects: ProjectRegistry) -> Self {
        Self {
            tabs: TabManager::new(),
            projects,
            active_project_id: None,
            session_ids: SessionIdAllocator::new(),
            next_pane_id: 1,
            tree_observers: ObserverList::new(),
        }
    }

    pub fn tabs(&self) -> &TabManager {
        &self.tabs
    }

    pub fn projects(&self) -> &ProjectRegistry {
        &self.projects
    }

    pub fn projects_mut(&mut self) -> &mut ProjectRegistry {
        &mut self.projects
    }

    pub fn active_project_id(&self) -> Option<&ProjectId> {
        self.active_project_id.as_ref()
    }

    /// Set the active project. Unknown ids are rejected.
    pub fn set_active_project(&mut self, project_id: Option<ProjectId>) -> bool {
        if let Some(id) = &project_id
            && !self.projects.contains(id)
        {
            return false;
        }
        self.active_project_id = project_id;
        true
    }

    pub fn allocate_pane_id(&mut self) -> PaneId {
        let id = self.next_pane_id;
        self.next_pane_id += 1;
        id
    }

    pub fn allocate_session_id(&mut self, tab_id: TabId, pane_id: PaneId) -> SessionId {
        self.session_ids.allocate(tab_id, pane_id)
    }

    /// Subscribe to tree replacements
    pub fn subscribe_tree_changes(
        &mut self,
        callback: Box<dyn FnMut(&TreeChange) + Send>,
    ) -> SubscriptionId {
        self.tree_observers.subscribe(callback)
    }

    pub fn unsubscribe_tree_changes(&mut self, id: SubscriptionId) -> bool {
        self.tree_observers.unsubscribe(id)
    }

    /// Locate a pane in any tab
    pub fn find_pane(&self, pane_id: PaneId) -> Option<(TabId, Arc<Pane>)> {
        self.tabs.tabs().iter().find_map(|tab| {
            tab.tree
                .as_ref()
                .and_then(|tree| tree.find_pane(pane_id))
                .map(|pane| (tab.id, Arc::clone(pane)))
        })
    }

    /// Open a terminal tab with one pane and make it active
    pub fn new_terminal_tab(
        &mut self,
        cwd: Option<String>,
        project_id: Option<ProjectId>,
    ) -> (TabId, Arc<Pane>) {
        let tab_id = self.tabs.allocate_tab_id();
        let pane_id = self.allocate_pane_id();
        let pane = Arc::new(Pane::new(
            pane_id,
            self.session_ids.allocate(tab_id, pane_id),
            cwd,
        ));

        let root = PaneNode::Leaf(Arc::clone(&pane));
        let mut tab = Tab::with_root(tab_id, root.clone());
        tab.project_id = project_id.filter(|id| self.projects.contains(id));
        self.tabs.open_tab(tab);

        self.tree_observers.dispatch(&TreeChange {
            tab_id,
            tree: Some(root),
            changed_panes: vec![pane_id],
        });
        crate::debug_info!("PANE_SPLIT", "Tab {} opened with pane {}", tab_id, pane_id);
        (tab_id, pane)
    }

    /// Add a fully built tab (restore path)
    pub(crate) fn push_tab(&mut self, tab: Tab) {
        if let Some(tree) = &tab.tree {
            self.next_pane_id = self.next_pane_id.max(tree.max_pane_id() + 1);
        }
        self.tabs.push_tab(tab);
    }

    pub(crate) fn session_ids_mut(&mut self) -> &mut SessionIdAllocator {
        &mut self.session_ids
    }

    /// Replace a tab's tree and notify observers. Returns the changed pane
    /// ids, or `None` if the tree is the same allocation as before.
    fn apply_tree(&mut self, tab_id: TabId, tree: Option<PaneNode>) -> Option<Vec<PaneId>> {
        let tab = self.tabs.get_mut(tab_id)?;
        let unchanged = match (&tab.tree, &tree) {
            (Some(old), Some(new)) => old.ptr_eq(new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return None;
        }

        let changed = tab.set_tree(tree.clone());
        self.tree_observers.dispatch(&TreeChange {
            tab_id,
            tree,
            changed_panes: changed.clone(),
        });
        Some(changed)
    }

    fn tree_of(&self, tab_id: TabId) -> Option<&PaneNode> {
        self.tabs.get(tab_id).and_then(|tab| tab.tree.as_ref())
    }

    /// Split `target` and return the new pane. `cwd` defaults to the
    /// target's working directory.
    pub fn split_pane(
        &mut self,
        tab_id: TabId,
        target: PaneId,
        direction: SplitDirection,
        placement: Placement,
        cwd: Option<String>,
    ) -> Option<Arc<Pane>> {
        let target_pane = self.tree_of(tab_id)?.find_pane(target)?.clone();
        let pane_id = self.allocate_pane_id();
        let session_id = self.session_ids.allocate(tab_id, pane_id);
        let cwd = cwd.or_else(|| target_pane.working_directory.clone());

        let tree = self.tree_of(tab_id)?;
        let updated = pane::insert_split_at(
            tree,
            target,
            Pane::new(pane_id, session_id, cwd),
            direction,
            placement,
        );
        self.apply_tree(tab_id, Some(updated));
        log::info!(
            "Split pane {} in tab {} ({}): new pane {}",
            target,
            tab_id,
            direction.as_str(),
            pane_id
        );

        if let Some(tab) = self.tabs.get_mut(tab_id) {
            tab.set_active_pane(pane_id);
        }
        self.find_pane(pane_id).map(|(_, pane)| pane)
    }

    /// Remove a pane from its tab's tree. `None` if the pane is not in the tab.
    pub fn remove_pane(&mut self, tab_id: TabId, pane_id: PaneId) -> Option<PaneRemoval> {
        let tree = self.tree_of(tab_id)?;
        if !tree.contains_pane(pane_id) {
            return None;
        }
        match pane::remove_pane(tree, pane_id) {
            Some(updated) => {
                self.apply_tree(tab_id, Some(updated));
                crate::debug_info!("PANE_SPLIT", "Removed pane {} from tab {}", pane_id, tab_id);
                Some(PaneRemoval::Removed)
            }
            None => Some(PaneRemoval::TabEmptied),
        }
    }

    /// Close a tab, returning it so the caller can release its sessions
    pub fn close_tab(&mut self, tab_id: TabId) -> Option<Tab> {
        let tab = self.tabs.close_tab(tab_id)?;
        let changed_panes = tab.tree.as_ref().map(PaneNode::pane_ids).unwrap_or_default();
        self.tree_observers.dispatch(&TreeChange {
            tab_id,
            tree: None,
            changed_panes,
        });
        Some(tab)
    }

    pub fn dock_pane(
        &mut self,
        tab_id: TabId,
        dragged: PaneId,
        target: PaneId,
        direction: SplitDirection,
        placement: Placement,
    ) -> bool {
        let Some(tree) = self.tree_of(tab_id) else {
            return false;
        };
        let updated = pane::dock_pane_at(tree, dragged, target, direction, placement);
        self.apply_tree(tab_id, Some(updated)).is_some()
    }

    pub fn swap_panes(&mut self, tab_id: TabId, a: PaneId, b: PaneId) -> bool {
        let Some(tree) = self.tree_of(tab_id) else {
            return false;
        };
        let updated = pane::swap_panes(tree, a, b);
        self.apply_tree(tab_id, Some(updated)).is_some()
    }

    /// Feed interactive divider drags back into the model
    pub fn resize_splits(&mut self, tab_id: TabId, child_ids: &[PaneId], sizes: &[f64]) -> bool {
        let Some(tree) = self.tree_of(tab_id) else {
            return false;
        };
        let updated = pane::update_sizes(tree, child_ids, sizes);
        self.apply_tree(tab_id, Some(updated)).is_some()
    }

    /// Copy-on-write update of one pane's payload
    pub fn update_pane(&mut self, pane_id: PaneId, f: impl FnOnce(&Pane) -> Pane) -> bool {
        let Some((tab_id, _)) = self.find_pane(pane_id) else {
            return false;
        };
        let Some(tree) = self.tree_of(tab_id) else {
            return false;
        };
        let updated = pane::update_pane(tree, pane_id, f);
        self.apply_tree(tab_id, Some(updated)).is_some()
    }

    /// Record a working-directory change reported by shell integration
    pub fn set_pane_cwd(&mut self, pane_id: PaneId, cwd: &str) -> bool {
        let unchanged = self
            .find_pane(pane_id)
            .is_some_and(|(_, p)| p.working_directory.as_deref() == Some(cwd));
        if unchanged {
            return false;
        }
        self.update_pane(pane_id, |p| Pane {
            working_directory: Some(cwd.to_string()),
            ..p.clone()
        })
    }

    /// Record session activity. Runtime-only, so the snapshot is unaffected.
    pub fn set_pane_activity(&mut self, pane_id: PaneId, at: DateTime<Utc>) -> bool {
        self.update_pane(pane_id, |p| Pane {
            last_activity: Some(at),
            ..p.clone()
        })
    }

    /// Set or clear a pane's user label
    pub fn set_pane_label(&mut self, pane_id: PaneId, label: Option<String>) -> bool {
        self.update_pane(pane_id, |p| Pane {
            custom_label: label.filter(|l| !l.trim().is_empty()),
            ..p.clone()
        })
    }

    /// Record the foreground process name reported by the host
    pub fn set_pane_process_name(&mut self, pane_id: PaneId, name: Option<String>) -> bool {
        let unchanged = self
            .find_pane(pane_id)
            .is_some_and(|(_, p)| p.process_name == name);
        if unchanged {
            return false;
        }
        self.update_pane(pane_id, |p| Pane {
            process_name: name,
            ..p.clone()
        })
    }

    pub fn set_active_pane(&mut self, tab_id: TabId, pane_id: PaneId) -> bool {
        self.tabs
            .get_mut(tab_id)
            .is_some_and(|tab| tab.set_active_pane(pane_id))
    }

    pub fn switch_tab(&mut self, tab_id: TabId) -> bool {
        self.tabs.switch_to(tab_id)
    }

    /// Rename a tab; it stops following the working directory
    pub fn rename_tab(&mut self, tab_id: TabId, title: &str) -> bool {
        let Some(tab) = self.tabs.get_mut(tab_id) else {
            return false;
        };
        tab.set_title(title);
        true
    }
}
