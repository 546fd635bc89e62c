//! `SessionManager`: owns every pane's session state machine.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use par_mux_config::{Config, ShellIntegrationConfig, TabId, TimingConfig};
use par_mux_shell::{ShellEvent, ShellIntegration};

use super::events::{HostEvent, PaneShellEvent, SessionEvent};
use super::output::OutputQueue;
use super::resize::ResizeCoalescer;
use super::state::{SessionError, SessionInfo, SessionState, ShellSummary};
use crate::observer::{ObserverList, SubscriptionId};
use crate::pane::{PaneId, SessionId};
use crate::traits::{CreateSessionRequest, PaneSurface, SessionHost};

/// Minimum spacing between two `Activity` notifications for one pane
const ACTIVITY_REPORT_INTERVAL_MS: i64 = 1000;

/// Runtime state for one pane's session
struct PaneSession {
    tab_id: TabId,
    session_id: SessionId,
    state: SessionState,
    working_directory: Option<String>,
    /// Most recent nonzero surface size, as (cols, rows)
    size: Option<(u16, u16)>,
    surface: Option<Box<dyn PaneSurface>>,
    paused: bool,
    queue: OutputQueue,
    resize: ResizeCoalescer,
    shell: ShellIntegration,
    shell_observers: ObserverList<PaneShellEvent>,
    last_exit_code: Option<i32>,
    failure: Option<String>,
    replay_available: bool,
    /// Whether a creation request reached the host for the current id
    host_bound: bool,
    removal_deadline: Option<Instant>,
    /// Last output applied or input forwarded
    last_activity: Option<DateTime<Utc>>,
    /// When the last `Activity` notification went out
    activity_reported: Option<DateTime<Utc>>,
}

impl PaneSession {
    /// Stamp activity, reporting it at most once per interval.
    fn touch(&mut self, pane_id: PaneId, events: &mut Vec<SessionEvent>) {
        let now = Utc::now();
        self.last_activity = Some(now);
        let due = self.activity_reported.is_none_or(|at| {
            now - at >= chrono::Duration::milliseconds(ACTIVITY_REPORT_INTERVAL_MS)
        });
        if due {
            self.activity_reported = Some(now);
            events.push(SessionEvent::Activity { pane_id, at: now });
        }
    }

    fn info(&self, pane_id: PaneId) -> SessionInfo {
        let current = self.shell.current_command();
        SessionInfo {
            pane_id,
            session_id: self.session_id.clone(),
            state: self.state,
            size: self.resize.applied(),
            working_directory: self.working_directory.clone(),
            last_exit_code: self.last_exit_code,
            failure: self.failure.clone(),
            replay_available: self.replay_available,
            unacked_bytes: self.queue.queued_bytes(),
            last_activity: self.last_activity,
            shell: ShellSummary {
                cwd: self.shell.cwd().map(str::to_string),
                host: self.shell.host().map(str::to_string),
                last_exit_code: self.shell.last_exit_code(),
                command_running: current.is_some_and(|c| c.running),
                history_len: self.shell.history_len(),
            },
        }
    }
}

/// Drives pane sessions against a [`SessionHost`].
///
/// All methods are synchronous and must be called from the single loop that
/// owns the workspace. Timers are advanced explicitly through
/// [`poll`](Self::poll); outbound notifications accumulate until
/// [`drain_events`](Self::drain_events).
pub struct SessionManager<H: SessionHost> {
    host: H,
    timing: TimingConfig,
    shell_config: ShellIntegrationConfig,
    sessions: HashMap<PaneId, PaneSession>,
    by_session: HashMap<SessionId, PaneId>,
    events: Vec<SessionEvent>,
}

impl<H: SessionHost> SessionManager<H> {
    pub fn new(host: H, config: &Config) -> Self {
        Self {
            host,
            timing: config.timing.clone(),
            shell_config: config.shell_integration.clone(),
            sessions: HashMap::new(),
            by_session: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Bind a new pane to `session_id` in the `Unbound` state.
    ///
    /// Registering a pane twice is a no-op.
    pub fn register(
        &mut self,
        pane_id: PaneId,
        tab_id: TabId,
        session_id: SessionId,
        working_directory: Option<String>,
    ) {
        if self.sessions.contains_key(&pane_id) {
            log::debug!("Pane {} already has a session", pane_id);
            return;
        }

        let mut shell = ShellIntegration::new(self.shell_config.command_history_limit);
        if let Some(cwd) = &working_directory {
            shell.set_initial_cwd(cwd.clone());
        }

        self.by_session.insert(session_id.clone(), pane_id);
        self.sessions.insert(
            pane_id,
            PaneSession {
                tab_id,
                session_id,
                state: SessionState::Unbound,
                working_directory,
                size: None,
                surface: None,
                paused: false,
                queue: OutputQueue::new(),
                resize: ResizeCoalescer::new(&self.timing),
                shell,
                shell_observers: ObserverList::new(),
                last_exit_code: None,
                failure: None,
                replay_available: false,
                host_bound: false,
                removal_deadline: None,
                last_activity: None,
                activity_reported: None,
            },
        );
    }

    pub fn contains(&self, pane_id: PaneId) -> bool {
        self.sessions.contains_key(&pane_id)
    }

    pub fn state(&self, pane_id: PaneId) -> Option<SessionState> {
        self.sessions.get(&pane_id).map(|s| s.state)
    }

    pub fn session_info(&self, pane_id: PaneId) -> Option<SessionInfo> {
        self.sessions.get(&pane_id).map(|s| s.info(pane_id))
    }

    /// Last time output was applied or input forwarded for a pane
    pub fn last_activity(&self, pane_id: PaneId) -> Option<DateTime<Utc>> {
        self.sessions.get(&pane_id).and_then(|s| s.last_activity)
    }

    /// Pane currently owning `session_id`
    pub fn pane_for_session(&self, session_id: &SessionId) -> Option<PaneId> {
        self.by_session.get(session_id).copied()
    }

    /// Completed commands for a pane, oldest first
    pub fn command_history(&self, pane_id: PaneId) -> Vec<par_mux_shell::CommandRecord> {
        self.sessions
            .get(&pane_id)
            .map(|s| s.shell.history().cloned().collect())
            .unwrap_or_default()
    }

    /// Attach a rendering surface. `Unbound` panes move to `Pending`.
    pub fn mount(&mut self, pane_id: PaneId, surface: Box<dyn PaneSurface>) {
        let Some(session) = self.sessions.get_mut(&pane_id) else {
            log::debug!("mount: unknown pane {}", pane_id);
            return;
        };
        session.surface = Some(surface);
        if session.state == SessionState::Unbound {
            session.state = SessionState::Pending;
            crate::debug_info!("SESSION", "Pane {} pending", pane_id);
        }
        self.try_create(pane_id);
    }

    /// Detach the surface without releasing the session.
    ///
    /// Unacknowledged output is discarded; the host retains it and replays
    /// it when the pane is mounted again and creation reconnects. The replay
    /// is acknowledged once applied, which settles the discarded bytes.
    pub fn unmount(&mut self, pane_id: PaneId) {
        let Some(session) = self.sessions.get_mut(&pane_id) else {
            return;
        };
        session.surface = None;
        session.resize.cancel();
        let discarded = session.queue.clear();
        if discarded > 0 {
            log::debug!("Pane {} unmounted with {} unacked bytes", pane_id, discarded);
        }
        session.shell.reset();
        if session.state.is_live() {
            session.state = SessionState::Pending;
        }
    }

    /// Supply the resolved working directory
    pub fn set_working_directory(&mut self, pane_id: PaneId, cwd: String) {
        let Some(session) = self.sessions.get_mut(&pane_id) else {
            return;
        };
        if session.shell.cwd().is_none() {
            session.shell.set_initial_cwd(cwd.clone());
        }
        session.working_directory = Some(cwd);
        self.try_create(pane_id);
    }

    /// Report the surface's grid size. Zero-sized reports are ignored.
    pub fn surface_resized(&mut self, pane_id: PaneId, cols: u16, rows: u16, now: Instant) {
        if cols == 0 || rows == 0 {
            return;
        }
        let Some(session) = self.sessions.get_mut(&pane_id) else {
            return;
        };
        session.size = Some((cols, rows));

        match session.state {
            SessionState::Pending => self.try_create(pane_id),
            SessionState::Created | SessionState::Active => {
                crate::debug_trace!("RESIZE", "Pane {} signal {}x{}", pane_id, cols, rows);
                session.resize.signal(cols, rows, now);
            }
            SessionState::Unbound | SessionState::Exited => {}
        }
    }

    fn try_create(&mut self, pane_id: PaneId) {
        let Some(session) = self.sessions.get_mut(&pane_id) else {
            return;
        };
        if session.state != SessionState::Pending || session.surface.is_none() {
            return;
        }
        let (Some(cwd), Some((cols, rows))) = (session.working_directory.clone(), session.size)
        else {
            return;
        };

        let request = CreateSessionRequest {
            session_id: session.session_id.clone(),
            cwd,
            cols,
            rows,
        };
        log::info!(
            "Creating session {} for pane {} ({}x{} in {})",
            request.session_id,
            pane_id,
            cols,
            rows,
            request.cwd
        );

        match self.host.create_session(request) {
            Ok(()) => {
                session.state = SessionState::Created;
                session.host_bound = true;
                session.resize.reset_to(cols, rows);
            }
            Err(e) => {
                log::warn!("Session creation failed for pane {}: {:#}", pane_id, e);
                Self::mark_failed(session, pane_id, format!("{e:#}"), &mut self.events);
            }
        }
    }

    fn mark_failed(
        session: &mut PaneSession,
        pane_id: PaneId,
        message: String,
        events: &mut Vec<SessionEvent>,
    ) {
        session.state = SessionState::Exited;
        session.failure = Some(message.clone());
        session.resize.cancel();
        session.queue.clear();
        events.push(SessionEvent::Exited {
            pane_id,
            exit_code: None,
            failure: Some(message),
            restartable: true,
        });
    }

    /// Route an inbound host notification.
    ///
    /// Events for session ids no pane owns (a pane closed while the event
    /// was in flight) are dropped.
    pub fn handle_host_event(&mut self, event: HostEvent, now: Instant) {
        let Some(pane_id) = self.by_session.get(event.session_id()).copied() else {
            log::trace!("Dropping host event for unknown session {}", event.session_id());
            return;
        };

        match event {
            HostEvent::Created { replay, .. } => self.on_created(pane_id, replay),
            HostEvent::CreateFailed { message, .. } => {
                if let Some(session) = self.sessions.get_mut(&pane_id)
                    && session.state == SessionState::Created
                {
                    log::warn!("Host failed to create session for pane {}: {}", pane_id, message);
                    session.host_bound = false;
                    Self::mark_failed(session, pane_id, message, &mut self.events);
                }
            }
            HostEvent::Output { data, .. } => self.on_output(pane_id, data),
            HostEvent::Exited { exit_code, .. } => self.on_exited(pane_id, exit_code, now),
        }
    }

    fn on_created(&mut self, pane_id: PaneId, replay: Option<Vec<u8>>) {
        let Some(session) = self.sessions.get_mut(&pane_id) else {
            return;
        };
        if session.state != SessionState::Created {
            log::debug!(
                "Ignoring creation ack for pane {} in state {}",
                pane_id,
                session.state
            );
            return;
        }

        session.state = SessionState::Active;
        session.replay_available = replay.is_some();
        if let Some(replay) = replay.filter(|r| !r.is_empty())
            && let Some(surface) = session.surface.as_mut()
        {
            crate::debug_info!("SESSION", "Pane {} replaying {} bytes", pane_id, replay.len());
            if self.shell_config.enabled {
                // Replayed markers refresh cwd and exit status; commands are not re-announced
                let _ = session
                    .shell
                    .process_with(&replay, |bytes| render(&mut **surface, bytes));
                if let Some(cwd) = session.shell.cwd() {
                    session.working_directory = Some(cwd.to_string());
                }
            } else {
                surface.apply_output(&replay);
            }
            // The replay is the host's unacknowledged backlog
            self.host.ack_output(&session.session_id, replay.len());
        }

        log::info!("Session {} active for pane {}", session.session_id, pane_id);
        self.events.push(SessionEvent::Activated {
            pane_id,
            replayed: session.replay_available,
        });
        self.drain_output(pane_id);
    }

    fn on_output(&mut self, pane_id: PaneId, data: Vec<u8>) {
        let Some(session) = self.sessions.get_mut(&pane_id) else {
            return;
        };
        if session.surface.is_none() {
            // Left unacked; the host replays it on reconnection
            log::trace!("Pane {} detached, leaving {} bytes unacked", pane_id, data.len());
            return;
        }
        session.queue.push(data);
        self.drain_output(pane_id);
    }

    /// Apply queued chunks in order, acknowledging each once applied.
    fn drain_output(&mut self, pane_id: PaneId) {
        let Some(session) = self.sessions.get_mut(&pane_id) else {
            return;
        };
        if session.state != SessionState::Active || session.paused {
            return;
        }
        let Some(surface) = session.surface.as_mut() else {
            return;
        };

        let mut applied = false;
        while let Some(chunk) = session.queue.pop() {
            applied = true;
            if !self.shell_config.enabled {
                surface.apply_output(&chunk);
            } else {
                let events = session
                    .shell
                    .process_with(&chunk, |bytes| render(&mut **surface, bytes));
                for event in events {
                    if let ShellEvent::CwdChanged { cwd, .. } = &event {
                        session.working_directory = Some(cwd.clone());
                        self.events.push(SessionEvent::CwdChanged {
                            pane_id,
                            cwd: cwd.clone(),
                        });
                    }
                    session
                        .shell_observers
                        .dispatch(&PaneShellEvent { pane_id, event });
                }
            }

            self.host.ack_output(&session.session_id, chunk.len());
        }

        if applied {
            session.touch(pane_id, &mut self.events);
        }
    }

    fn on_exited(&mut self, pane_id: PaneId, exit_code: Option<i32>, now: Instant) {
        // Output produced before the exit is still shown
        self.drain_output(pane_id);

        let Some(session) = self.sessions.get_mut(&pane_id) else {
            return;
        };
        if session.state == SessionState::Exited {
            return;
        }

        log::info!(
            "Session {} for pane {} exited with {:?}",
            session.session_id,
            pane_id,
            exit_code
        );
        session.state = SessionState::Exited;
        session.last_exit_code = exit_code;
        session.resize.cancel();
        session.queue.clear();
        session.removal_deadline = Some(now + self.timing.exit_grace());
        self.events.push(SessionEvent::Exited {
            pane_id,
            exit_code,
            failure: None,
            restartable: true,
        });
    }

    /// Forward user input. Only `Active` sessions accept input.
    pub fn write(&mut self, pane_id: PaneId, data: &[u8]) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&pane_id)
            .ok_or(SessionError::UnknownPane(pane_id))?;
        if session.state != SessionState::Active {
            return Err(SessionError::InvalidState {
                pane_id,
                state: session.state,
                expected: "active",
            });
        }
        self.host.write_session(&session.session_id, data)?;
        session.touch(pane_id, &mut self.events);
        Ok(())
    }

    /// Pause or resume applying output (e.g. the pane is backgrounded).
    ///
    /// While paused, chunks stay queued and unacknowledged, which throttles
    /// the host.
    pub fn set_surface_paused(&mut self, pane_id: PaneId, paused: bool) {
        let Some(session) = self.sessions.get_mut(&pane_id) else {
            return;
        };
        session.paused = paused;
        if !paused {
            self.drain_output(pane_id);
        }
    }

    /// Restart an exited pane under a fresh session id.
    ///
    /// Cancels the pending removal and re-enters `Pending` (or `Unbound`
    /// if no surface is mounted).
    pub fn restart(&mut self, pane_id: PaneId, new_session_id: SessionId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&pane_id)
            .ok_or(SessionError::UnknownPane(pane_id))?;
        if session.state != SessionState::Exited {
            return Err(SessionError::InvalidState {
                pane_id,
                state: session.state,
                expected: "exited",
            });
        }

        let old_id = std::mem::replace(&mut session.session_id, new_session_id.clone());
        session.removal_deadline = None;
        session.failure = None;
        session.replay_available = false;
        session.queue.clear();
        session.shell.reset();
        session.state = if session.surface.is_some() {
            SessionState::Pending
        } else {
            SessionState::Unbound
        };
        let was_bound = std::mem::replace(&mut session.host_bound, false);

        self.by_session.remove(&old_id);
        self.by_session.insert(new_session_id.clone(), pane_id);
        if was_bound {
            self.host.close_session(&old_id);
        }
        log::info!("Restarting pane {}: {} -> {}", pane_id, old_id, new_session_id);

        self.try_create(pane_id);
        Ok(())
    }

    /// Tear down a pane's session.
    ///
    /// Order: cancel timers, detach surface/queue/observers, drop the
    /// session-id index, then release the host handle. Returns false if the
    /// pane had no session.
    pub fn close(&mut self, pane_id: PaneId) -> bool {
        let Some(mut session) = self.sessions.remove(&pane_id) else {
            return false;
        };

        session.removal_deadline = None;
        session.resize.cancel();

        session.surface = None;
        session.queue.clear();
        session.shell_observers.clear();

        self.by_session.remove(&session.session_id);

        if session.host_bound {
            self.host.close_session(&session.session_id);
        }
        crate::debug_info!("SESSION", "Closed session {} for pane {}", session.session_id, pane_id);
        true
    }

    /// Subscribe to shell-integration notifications for one pane
    pub fn subscribe_shell_events(
        &mut self,
        pane_id: PaneId,
        callback: Box<dyn FnMut(&PaneShellEvent) + Send>,
    ) -> Option<SubscriptionId> {
        self.sessions
            .get_mut(&pane_id)
            .map(|s| s.shell_observers.subscribe(callback))
    }

    pub fn unsubscribe_shell_events(&mut self, pane_id: PaneId, id: SubscriptionId) -> bool {
        self.sessions
            .get_mut(&pane_id)
            .is_some_and(|s| s.shell_observers.unsubscribe(id))
    }

    /// Advance timers: forward settled resizes and report panes whose exit
    /// grace period elapsed.
    pub fn poll(&mut self, now: Instant) {
        let mut pane_ids: Vec<PaneId> = self.sessions.keys().copied().collect();
        pane_ids.sort_unstable();

        for pane_id in pane_ids {
            let Some(session) = self.sessions.get_mut(&pane_id) else {
                continue;
            };

            if let Some(deadline) = session.removal_deadline
                && now >= deadline
            {
                session.removal_deadline = None;
                self.events.push(SessionEvent::RemovalDue {
                    pane_id,
                    tab_id: session.tab_id,
                });
            }

            if !session.state.is_live() {
                continue;
            }
            let scrollback = session
                .surface
                .as_ref()
                .map_or(0, |surface| surface.scrollback_lines());
            if let Some((cols, rows)) = session.resize.poll(now, scrollback) {
                crate::debug_log!("RESIZE", "Pane {} -> {}x{}", pane_id, cols, rows);
                if let Err(e) = self.host.resize_session(&session.session_id, cols, rows) {
                    // The session may be going away underneath us
                    log::debug!("Resize of {} failed: {:#}", session.session_id, e);
                }
            }
        }
    }

    /// Earliest pending timer across all sessions
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sessions
            .values()
            .flat_map(|s| [s.removal_deadline, s.resize.next_deadline()])
            .flatten()
            .min()
    }

    /// Take accumulated notifications
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Panes with a registered session, sorted
    pub fn pane_ids(&self) -> Vec<PaneId> {
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Apply a slice of output and report where the cursor ended up.
fn render(surface: &mut dyn PaneSurface, bytes: &[u8]) -> usize {
    if !bytes.is_empty() {
        surface.apply_output(bytes);
    }
    surface.cursor_line()
}
