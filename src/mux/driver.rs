//! The async event loop that owns a [`Mux`].
//!
//! One task, one owner: UI commands, host events and resolved working
//! directories all arrive over channels and are applied in turn, and a
//! periodic tick advances the timers. Filesystem checks run on the blocking
//! pool so they never stall output.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{CwdRequest, Mux};
use crate::pane::{PaneId, Placement, SplitDirection};
use crate::session::HostEvent;
use crate::tab::{ProjectId, TabId};
use crate::traits::{PaneSurface, SessionHost, SettingsStore};
use crate::workspace::restore::validate_cwd;

/// Requests from the UI
pub enum MuxCommand {
    NewTab {
        cwd: Option<String>,
        project_id: Option<ProjectId>,
    },
    SplitPane {
        tab_id: TabId,
        target: PaneId,
        direction: SplitDirection,
        placement: Placement,
    },
    ClosePane(PaneId),
    CloseTab(TabId),
    DockPane {
        tab_id: TabId,
        dragged: PaneId,
        target: PaneId,
        direction: SplitDirection,
        placement: Placement,
    },
    SwapPanes {
        tab_id: TabId,
        a: PaneId,
        b: PaneId,
    },
    ResizeSplits {
        tab_id: TabId,
        child_ids: Vec<PaneId>,
        sizes: Vec<f64>,
    },
    Mount {
        pane_id: PaneId,
        surface: Box<dyn PaneSurface>,
    },
    Unmount(PaneId),
    SurfaceResized {
        pane_id: PaneId,
        cols: u16,
        rows: u16,
    },
    Input {
        pane_id: PaneId,
        data: Vec<u8>,
    },
    Restart(PaneId),
    SetActivePane {
        tab_id: TabId,
        pane_id: PaneId,
    },
    SwitchTab(TabId),
    /// Write the snapshot without waiting for the debounce
    Flush,
    /// Flush and stop the loop
    Shutdown,
}

impl std::fmt::Debug for MuxCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MuxCommand::NewTab { .. } => "NewTab",
            MuxCommand::SplitPane { .. } => "SplitPane",
            MuxCommand::ClosePane(_) => "ClosePane",
            MuxCommand::CloseTab(_) => "CloseTab",
            MuxCommand::DockPane { .. } => "DockPane",
            MuxCommand::SwapPanes { .. } => "SwapPanes",
            MuxCommand::ResizeSplits { .. } => "ResizeSplits",
            MuxCommand::Mount { .. } => "Mount",
            MuxCommand::Unmount(_) => "Unmount",
            MuxCommand::SurfaceResized { .. } => "SurfaceResized",
            MuxCommand::Input { .. } => "Input",
            MuxCommand::Restart(_) => "Restart",
            MuxCommand::SetActivePane { .. } => "SetActivePane",
            MuxCommand::SwitchTab(_) => "SwitchTab",
            MuxCommand::Flush => "Flush",
            MuxCommand::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

/// Run the loop until `Shutdown` arrives or every command sender is gone.
///
/// The snapshot is flushed on the way out and the controller is handed back.
pub async fn run<H, S>(
    mut mux: Mux<H, S>,
    mut commands: mpsc::Receiver<MuxCommand>,
    mut host_events: mpsc::Receiver<HostEvent>,
    tick: Duration,
) -> Mux<H, S>
where
    H: SessionHost,
    S: SettingsStore,
{
    let (cwd_tx, mut cwd_rx) = mpsc::unbounded_channel::<(PaneId, String)>();
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let fallback = mux.config().default_working_directory();

    log::info!("Mux driver started (tick {:?})", tick);
    loop {
        for request in mux.take_cwd_requests() {
            spawn_cwd_resolution(request, fallback.clone(), cwd_tx.clone());
        }

        tokio::select! {
            command = commands.recv() => match command {
                Some(MuxCommand::Shutdown) | None => break,
                Some(command) => apply_command(&mut mux, command, Instant::now()),
            },
            Some(event) = host_events.recv() => mux.handle_host_event(event, Instant::now()),
            Some((pane_id, cwd)) = cwd_rx.recv() => {
                mux.set_working_directory(pane_id, cwd, Instant::now());
            }
            _ = ticker.tick() => mux.poll(Instant::now()),
        }
    }

    if let Err(e) = mux.flush_snapshot() {
        log::warn!("Failed to flush workspace snapshot on shutdown: {:#}", e);
    }
    log::info!("Mux driver stopped");
    mux
}

fn spawn_cwd_resolution(
    request: CwdRequest,
    fallback: String,
    results: mpsc::UnboundedSender<(PaneId, String)>,
) {
    tokio::task::spawn_blocking(move || {
        let cwd = validate_cwd(request.requested.as_deref(), &fallback);
        // The loop may already be gone during shutdown
        let _ = results.send((request.pane_id, cwd));
    });
}

fn apply_command<H, S>(mux: &mut Mux<H, S>, command: MuxCommand, now: Instant)
where
    H: SessionHost,
    S: SettingsStore,
{
    crate::debug_trace!("MUX", "Command {:?}", command);
    match command {
        MuxCommand::NewTab { cwd, project_id } => {
            mux.new_tab(cwd, project_id, now);
        }
        MuxCommand::SplitPane {
            tab_id,
            target,
            direction,
            placement,
        } => {
            if mux.split_pane(tab_id, target, direction, placement, now).is_none() {
                log::debug!("Split of pane {} in tab {} ignored", target, tab_id);
            }
        }
        MuxCommand::ClosePane(pane_id) => {
            mux.close_pane(pane_id, now);
        }
        MuxCommand::CloseTab(tab_id) => {
            mux.close_tab(tab_id, now);
        }
        MuxCommand::DockPane {
            tab_id,
            dragged,
            target,
            direction,
            placement,
        } => {
            mux.dock_pane(tab_id, dragged, target, direction, placement, now);
        }
        MuxCommand::SwapPanes { tab_id, a, b } => {
            mux.swap_panes(tab_id, a, b, now);
        }
        MuxCommand::ResizeSplits {
            tab_id,
            child_ids,
            sizes,
        } => {
            mux.resize_splits(tab_id, &child_ids, &sizes, now);
        }
        MuxCommand::Mount { pane_id, surface } => mux.mount_surface(pane_id, surface, now),
        MuxCommand::Unmount(pane_id) => mux.unmount_surface(pane_id),
        MuxCommand::SurfaceResized {
            pane_id,
            cols,
            rows,
        } => mux.surface_resized(pane_id, cols, rows, now),
        MuxCommand::Input { pane_id, data } => {
            if let Err(e) = mux.send_input(pane_id, &data) {
                log::debug!("Input for pane {} dropped: {}", pane_id, e);
            }
        }
        MuxCommand::Restart(pane_id) => {
            if let Err(e) = mux.restart_pane(pane_id, now) {
                log::warn!("Restart of pane {} failed: {}", pane_id, e);
            }
        }
        MuxCommand::SetActivePane { tab_id, pane_id } => {
            mux.set_active_pane(tab_id, pane_id, now);
        }
        MuxCommand::SwitchTab(tab_id) => {
            mux.switch_tab(tab_id, now);
        }
        MuxCommand::Flush => {
            if let Err(e) = mux.flush_snapshot() {
                log::warn!("Failed to flush workspace snapshot: {:#}", e);
            }
        }
        MuxCommand::Shutdown => {}
    }
}
