//! Tab manager: ordered tabs, the active tab, and tab id allocation

use super::{Tab, TabId};
use crate::pane::PaneId;

/// Manages the workspace's tabs
#[derive(Debug)]
pub struct TabManager {
    /// All tabs, in display order
    tabs: Vec<Tab>,
    /// Currently active tab ID
    active_tab_id: Option<TabId>,
    /// Counter for generating unique tab IDs
    next_tab_id: TabId,
}

impl Default for TabManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TabManager {
    /// Create a new empty tab manager
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            active_tab_id: None,
            next_tab_id: 1,
        }
    }

    /// Reserve the next tab id
    pub fn allocate_tab_id(&mut self) -> TabId {
        let id = self.next_tab_id;
        self.next_tab_id += 1;
        id
    }

    /// Append a tab and switch to it
    pub fn open_tab(&mut self, tab: Tab) {
        let id = tab.id;
        self.push_tab(tab);
        self.active_tab_id = Some(id);
        log::info!("Created new tab {} (total: {})", id, self.tabs.len());
    }

    /// Append an existing tab, keeping ids ahead of it
    pub fn push_tab(&mut self, tab: Tab) {
        self.next_tab_id = self.next_tab_id.max(tab.id + 1);
        if self.active_tab_id.is_none() {
            self.active_tab_id = Some(tab.id);
        }
        self.tabs.push(tab);
    }

    /// Close a tab by ID, returning it so the caller can tear down its panes.
    ///
    /// If the active tab closes, the tab at the same index (or the previous
    /// one at the end) becomes active.
    pub fn close_tab(&mut self, id: TabId) -> Option<Tab> {
        let idx = self.tabs.iter().position(|t| t.id == id)?;
        log::info!("Closing tab {} (index {})", id, idx);

        let tab = self.tabs.remove(idx);
        if self.active_tab_id == Some(id) {
            self.active_tab_id = if self.tabs.is_empty() {
                None
            } else {
                let new_idx = idx.min(self.tabs.len().saturating_sub(1));
                Some(self.tabs[new_idx].id)
            };
        }
        Some(tab)
    }

    /// Switch to a tab by ID. Returns false if no such tab exists.
    pub fn switch_to(&mut self, id: TabId) -> bool {
        if !self.tabs.iter().any(|t| t.id == id) {
            return false;
        }
        self.active_tab_id = Some(id);
        log::debug!("Switched to tab {}", id);
        true
    }

    /// Get a reference to the active tab
    pub fn active_tab(&self) -> Option<&Tab> {
        self.active_tab_id.and_then(|id| self.get(id))
    }

    /// Get a mutable reference to the active tab
    pub fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        let active_id = self.active_tab_id;
        active_id.and_then(move |id| self.tabs.iter_mut().find(|t| t.id == id))
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.active_tab_id
    }

    pub fn get(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    /// Tab whose tree contains `pane_id`
    pub fn tab_for_pane(&self, pane_id: PaneId) -> Option<TabId> {
        self.tabs
            .iter()
            .find(|t| t.contains_pane(pane_id))
            .map(|t| t.id)
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Remove every tab
    pub fn drain_tabs(&mut self) -> Vec<Tab> {
        self.active_tab_id = None;
        std::mem::take(&mut self.tabs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::{Pane, SessionId};

    fn make(tabs: &mut TabManager, pane_id: PaneId) -> TabId {
        let id = tabs.allocate_tab_id();
        let pane = Pane::new(pane_id, SessionId::new(format!("tab{id}")), None);
        tabs.open_tab(Tab::new_terminal(id, pane));
        id
    }

    #[test]
    fn test_new_tabs_become_active() {
        let mut tabs = TabManager::new();
        let a = make(&mut tabs, 1);
        let b = make(&mut tabs, 2);
        assert_eq!((a, b), (1, 2));
        assert_eq!(tabs.active_tab_id(), Some(b));
        assert_eq!(tabs.tab_for_pane(1), Some(a));
    }

    #[test]
    fn test_close_active_selects_neighbour() {
        let mut tabs = TabManager::new();
        let a = make(&mut tabs, 1);
        let b = make(&mut tabs, 2);
        let c = make(&mut tabs, 3);

        tabs.switch_to(b);
        assert_eq!(tabs.close_tab(b).map(|t| t.id), Some(b));
        assert_eq!(tabs.active_tab_id(), Some(c));

        tabs.close_tab(c);
        assert_eq!(tabs.active_tab_id(), Some(a));
        tabs.close_tab(a);
        assert_eq!(tabs.active_tab_id(), None);
        assert!(tabs.close_tab(a).is_none());
    }

    #[test]
    fn test_push_tab_keeps_ids_unique() {
        let mut tabs = TabManager::new();
        tabs.push_tab(Tab::new_other(7, "Docs"));
        assert_eq!(tabs.active_tab_id(), Some(7));
        assert_eq!(tabs.allocate_tab_id(), 8);
        assert!(!tabs.switch_to(42));
    }
}
