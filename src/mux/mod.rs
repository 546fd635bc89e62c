//! The controller that ties the workspace model to live sessions.
//!
//! [`Mux`] is what a UI talks to. Every structural operation goes through
//! the [`Workspace`], every pane gets a session in the [`SessionManager`],
//! and every mutation arms the snapshot debounce. Nothing here blocks or
//! sleeps; [`driver::run`] supplies the event loop and the clock.

pub mod driver;

use std::time::Instant;

use anyhow::Result;
use par_mux_config::Config;

use crate::pane::{Pane, PaneId, PaneNode, Placement, SplitDirection};
use crate::session::{HostEvent, SessionError, SessionEvent, SessionManager, SessionState};
use crate::tab::{ProjectId, TabId};
use crate::traits::{PaneSurface, SessionHost, SettingsStore};
use crate::workspace::restore::validate_cwd;
use crate::workspace::{
    PaneRemoval, ProjectRegistry, SNAPSHOT_KEY, SnapshotScheduler, Workspace, restore_workspace,
};

pub use driver::{MuxCommand, run};

/// A pane whose working directory still has to be checked against the
/// filesystem before its session can be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CwdRequest {
    pub pane_id: PaneId,
    /// Directory the pane asked for; `None` means the configured default
    pub requested: Option<String>,
}

/// Workspace plus sessions plus persistence
pub struct Mux<H: SessionHost, S: SettingsStore> {
    config: Config,
    workspace: Workspace,
    sessions: SessionManager<H>,
    snapshots: SnapshotScheduler,
    store: S,
    pending_cwds: Vec<CwdRequest>,
    events: Vec<SessionEvent>,
    restore_warnings: Vec<String>,
}

impl<H: SessionHost, S: SettingsStore> Mux<H, S> {
    /// Restore the workspace from `store` and register a session for every
    /// restored pane. Restore problems are logged and kept in
    /// [`restore_warnings`](Self::restore_warnings).
    pub fn new(config: Config, host: H, store: S, projects: ProjectRegistry) -> Self {
        let json = match store.read_setting(SNAPSHOT_KEY) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to read workspace snapshot: {:#}", e);
                None
            }
        };
        let restored = restore_workspace(
            json.as_deref(),
            projects,
            Some(config.default_working_directory()),
        );

        let sessions = SessionManager::new(host, &config);
        let snapshots = SnapshotScheduler::new(config.timing.snapshot_debounce());
        let mut mux = Self {
            config,
            workspace: restored.workspace,
            sessions,
            snapshots,
            store,
            pending_cwds: Vec::new(),
            events: Vec::new(),
            restore_warnings: restored.warnings,
        };

        let panes: Vec<(TabId, PaneNode)> = mux
            .workspace
            .tabs()
            .tabs()
            .iter()
            .filter_map(|tab| tab.tree.clone().map(|tree| (tab.id, tree)))
            .collect();
        for (tab_id, tree) in panes {
            for pane in crate::pane::flatten_panes(&tree) {
                mux.register_pane(tab_id, &pane);
            }
        }
        log::info!(
            "Workspace ready: {} tabs, {} panes",
            mux.workspace.tabs().tab_count(),
            mux.sessions.pane_ids().len()
        );
        mux
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Mutable access for operations that need no session bookkeeping
    /// (projects, tree observers). Snapshot dirtiness is the caller's job.
    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    pub fn sessions(&self) -> &SessionManager<H> {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionManager<H> {
        &mut self.sessions
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn restore_warnings(&self) -> &[String] {
        &self.restore_warnings
    }

    fn register_pane(&mut self, tab_id: TabId, pane: &Pane) {
        self.sessions
            .register(pane.id, tab_id, pane.session_id.clone(), None);
        self.pending_cwds.push(CwdRequest {
            pane_id: pane.id,
            requested: pane.working_directory.clone(),
        });
    }

    fn mark_dirty(&mut self, now: Instant) {
        self.snapshots.mark_dirty(now);
    }

    // ── Working directories ─────────────────────────────────────────────

    /// Take the panes waiting for a working directory
    pub fn take_cwd_requests(&mut self) -> Vec<CwdRequest> {
        std::mem::take(&mut self.pending_cwds)
    }

    /// Resolve every pending working directory on the calling thread
    pub fn resolve_working_directories(&mut self, now: Instant) {
        let fallback = self.config.default_working_directory();
        for request in self.take_cwd_requests() {
            let cwd = validate_cwd(request.requested.as_deref(), &fallback);
            self.set_working_directory(request.pane_id, cwd, now);
        }
    }

    /// Deliver a resolved working directory for a pane
    pub fn set_working_directory(&mut self, pane_id: PaneId, cwd: String, now: Instant) {
        if self.workspace.set_pane_cwd(pane_id, &cwd) {
            self.mark_dirty(now);
        }
        self.sessions.set_working_directory(pane_id, cwd);
        self.collect_session_events(now);
    }

    // ── Structure ───────────────────────────────────────────────────────

    /// Open a terminal tab with a single pane
    pub fn new_tab(&mut self, cwd: Option<String>, project_id: Option<ProjectId>, now: Instant) -> TabId {
        let (tab_id, pane) = self.workspace.new_terminal_tab(cwd, project_id);
        self.register_pane(tab_id, &pane);
        self.mark_dirty(now);
        tab_id
    }

    /// Split `target`; the new pane inherits its working directory
    pub fn split_pane(
        &mut self,
        tab_id: TabId,
        target: PaneId,
        direction: SplitDirection,
        placement: Placement,
        now: Instant,
    ) -> Option<PaneId> {
        let pane = self
            .workspace
            .split_pane(tab_id, target, direction, placement, None)?;
        self.register_pane(tab_id, &pane);
        self.mark_dirty(now);
        Some(pane.id)
    }

    /// Close a pane and its session. Closing a tab's last pane closes the tab.
    pub fn close_pane(&mut self, pane_id: PaneId, now: Instant) -> bool {
        let Some((tab_id, _)) = self.workspace.find_pane(pane_id) else {
            return false;
        };
        match self.workspace.remove_pane(tab_id, pane_id) {
            Some(PaneRemoval::Removed) => {
                self.sessions.close(pane_id);
                self.mark_dirty(now);
                true
            }
            Some(PaneRemoval::TabEmptied) => self.close_tab(tab_id, now),
            None => false,
        }
    }

    /// Close a tab and every session in it
    pub fn close_tab(&mut self, tab_id: TabId, now: Instant) -> bool {
        let Some(tab) = self.workspace.close_tab(tab_id) else {
            return false;
        };
        for pane_id in tab.tree.as_ref().map(PaneNode::pane_ids).unwrap_or_default() {
            self.sessions.close(pane_id);
        }
        log::info!("Closed tab {} ({} panes)", tab_id, tab.pane_count());
        self.mark_dirty(now);
        true
    }

    pub fn dock_pane(
        &mut self,
        tab_id: TabId,
        dragged: PaneId,
        target: PaneId,
        direction: SplitDirection,
        placement: Placement,
        now: Instant,
    ) -> bool {
        let changed = self
            .workspace
            .dock_pane(tab_id, dragged, target, direction, placement);
        if changed {
            self.mark_dirty(now);
        }
        changed
    }

    pub fn swap_panes(&mut self, tab_id: TabId, a: PaneId, b: PaneId, now: Instant) -> bool {
        let changed = self.workspace.swap_panes(tab_id, a, b);
        if changed {
            self.mark_dirty(now);
        }
        changed
    }

    /// Divider drag: `child_ids` addresses the container, `sizes` its new weights
    pub fn resize_splits(
        &mut self,
        tab_id: TabId,
        child_ids: &[PaneId],
        sizes: &[f64],
        now: Instant,
    ) -> bool {
        let changed = self.workspace.resize_splits(tab_id, child_ids, sizes);
        if changed {
            self.mark_dirty(now);
        }
        changed
    }

    pub fn set_active_pane(&mut self, tab_id: TabId, pane_id: PaneId, now: Instant) -> bool {
        let changed = self.workspace.set_active_pane(tab_id, pane_id);
        if changed {
            self.mark_dirty(now);
        }
        changed
    }

    pub fn switch_tab(&mut self, tab_id: TabId, now: Instant) -> bool {
        let changed = self.workspace.switch_tab(tab_id);
        if changed {
            self.mark_dirty(now);
        }
        changed
    }

    pub fn rename_tab(&mut self, tab_id: TabId, title: &str, now: Instant) -> bool {
        let changed = self.workspace.rename_tab(tab_id, title);
        if changed {
            self.mark_dirty(now);
        }
        changed
    }

    /// Label a pane; `None` or a blank label clears it
    pub fn set_pane_label(&mut self, pane_id: PaneId, label: Option<String>, now: Instant) -> bool {
        let changed = self.workspace.set_pane_label(pane_id, label);
        if changed {
            self.mark_dirty(now);
        }
        changed
    }

    /// Foreground process name as reported by the host. Not persisted.
    pub fn set_pane_process_name(&mut self, pane_id: PaneId, name: Option<String>) -> bool {
        self.workspace.set_pane_process_name(pane_id, name)
    }

    // ── Sessions ────────────────────────────────────────────────────────

    pub fn mount_surface(&mut self, pane_id: PaneId, surface: Box<dyn PaneSurface>, now: Instant) {
        self.sessions.mount(pane_id, surface);
        self.collect_session_events(now);
    }

    pub fn unmount_surface(&mut self, pane_id: PaneId) {
        self.sessions.unmount(pane_id);
    }

    pub fn surface_resized(&mut self, pane_id: PaneId, cols: u16, rows: u16, now: Instant) {
        self.sessions.surface_resized(pane_id, cols, rows, now);
        self.collect_session_events(now);
    }

    pub fn send_input(&mut self, pane_id: PaneId, data: &[u8]) -> Result<(), SessionError> {
        self.sessions.write(pane_id, data)
    }

    /// Restart an exited pane under a fresh session id
    pub fn restart_pane(&mut self, pane_id: PaneId, now: Instant) -> Result<(), SessionError> {
        let (tab_id, _) = self
            .workspace
            .find_pane(pane_id)
            .ok_or(SessionError::UnknownPane(pane_id))?;
        if let Some(state) = self.sessions.state(pane_id)
            && state != SessionState::Exited
        {
            return Err(SessionError::InvalidState {
                pane_id,
                state,
                expected: "exited",
            });
        }

        let session_id = self.workspace.allocate_session_id(tab_id, pane_id);
        self.sessions.restart(pane_id, session_id.clone())?;
        self.workspace.update_pane(pane_id, |pane| Pane {
            session_id,
            ..pane.clone()
        });
        self.collect_session_events(now);
        Ok(())
    }

    pub fn handle_host_event(&mut self, event: HostEvent, now: Instant) {
        self.sessions.handle_host_event(event, now);
        self.collect_session_events(now);
    }

    /// Advance every timer: resize coalescing, exit grace, snapshot debounce
    pub fn poll(&mut self, now: Instant) {
        self.sessions.poll(now);
        self.collect_session_events(now);

        if self.snapshots.poll(now)
            && let Err(e) = self.snapshots.persist(&self.workspace, &mut self.store)
        {
            log::warn!("Failed to persist workspace snapshot: {:#}", e);
            crate::debug_error!("SNAPSHOT", "Persist failed: {:#}", e);
        }
    }

    /// Earliest instant at which [`poll`](Self::poll) has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.sessions.next_deadline(), self.snapshots.next_deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Write the snapshot now. Used before exit.
    pub fn flush_snapshot(&mut self) -> Result<bool> {
        self.snapshots.flush(&self.workspace, &mut self.store)
    }

    /// Take session notifications for the UI
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Apply session notifications that change the model, then queue them
    /// for the UI
    fn collect_session_events(&mut self, now: Instant) {
        for event in self.sessions.drain_events() {
            match &event {
                SessionEvent::CwdChanged { pane_id, cwd } => {
                    if self.workspace.set_pane_cwd(*pane_id, cwd) {
                        self.mark_dirty(now);
                    }
                }
                SessionEvent::RemovalDue { pane_id, .. } => {
                    if self.sessions.state(*pane_id) == Some(SessionState::Exited) {
                        crate::debug_info!("SESSION", "Removing exited pane {}", pane_id);
                        self.close_pane(*pane_id, now);
                    }
                }
                SessionEvent::Activity { pane_id, at } => {
                    self.workspace.set_pane_activity(*pane_id, *at);
                }
                SessionEvent::Activated { .. } | SessionEvent::Exited { .. } => {}
            }
            self.events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::SessionId;
    use crate::traits::CreateSessionRequest;
    use crate::workspace::MemorySettingsStore;
    use std::time::Duration;

    #[derive(Default)]
    struct NullHost {
        created: Vec<SessionId>,
        closed: Vec<SessionId>,
    }

    impl SessionHost for NullHost {
        fn create_session(&mut self, request: CreateSessionRequest) -> Result<()> {
            self.created.push(request.session_id);
            Ok(())
        }
        fn write_session(&mut self, _: &SessionId, _: &[u8]) -> Result<()> {
            Ok(())
        }
        fn resize_session(&mut self, _: &SessionId, _: u16, _: u16) -> Result<()> {
            Ok(())
        }
        fn ack_output(&mut self, _: &SessionId, _: usize) {}
        fn close_session(&mut self, session_id: &SessionId) {
            self.closed.push(session_id.clone());
        }
    }

    fn mux() -> Mux<NullHost, MemorySettingsStore> {
        let config = Config {
            default_working_directory: Some("/tmp".to_string()),
            ..Config::default()
        };
        Mux::new(config, NullHost::default(), MemorySettingsStore::new(), ProjectRegistry::new())
    }

    #[test]
    fn test_fresh_mux_has_default_tab_with_session() {
        let mux = mux();
        assert_eq!(mux.workspace().tabs().tab_count(), 1);
        assert_eq!(mux.sessions().pane_ids(), vec![1]);
        assert!(mux.restore_warnings().is_empty());
    }

    #[test]
    fn test_split_registers_session_and_arms_snapshot() {
        let mut mux = mux();
        let now = Instant::now();
        let tab_id = mux.workspace().tabs().tabs()[0].id;

        let new_pane = mux
            .split_pane(tab_id, 1, SplitDirection::Row, Placement::After, now)
            .unwrap();
        assert_eq!(mux.sessions().pane_ids(), vec![1, new_pane]);
        assert!(mux.next_deadline().is_some());

        mux.poll(now + Duration::from_secs(1));
        assert_eq!(mux.store().write_count(), 1);
    }

    #[test]
    fn test_closing_last_pane_closes_tab_and_session() {
        let mut mux = mux();
        let now = Instant::now();
        mux.new_tab(Some("/tmp".to_string()), None, now);
        assert_eq!(mux.workspace().tabs().tab_count(), 2);

        assert!(mux.close_pane(1, now));
        assert_eq!(mux.workspace().tabs().tab_count(), 1);
        assert!(!mux.sessions().contains(1));
        assert!(!mux.close_pane(1, now));
    }

    #[test]
    fn test_resolved_cwd_is_recorded_on_pane() {
        let mut mux = mux();
        let now = Instant::now();
        mux.resolve_working_directories(now);

        let (_, pane) = mux.workspace().find_pane(1).unwrap();
        assert_eq!(pane.working_directory.as_deref(), Some("/tmp"));
        assert!(mux.take_cwd_requests().is_empty());
    }
}
