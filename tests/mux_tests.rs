//! Controller and driver tests: sessions, timers and persistence wired
//! together through `Mux`.

mod common;

use std::time::{Duration, Instant};

use common::{MockHost, MockSurface, ms, test_config};
use par_mux::mux::{Mux, MuxCommand, run};
use par_mux::pane::{PaneId, Placement, SessionId, SplitDirection};
use par_mux::session::{HostEvent, SessionEvent, SessionState};
use par_mux::traits::SettingsStore;
use par_mux::workspace::{MemorySettingsStore, ProjectRegistry, SNAPSHOT_KEY, WorkspaceSnapshot};
use tokio::sync::mpsc;

fn new_mux(host: &MockHost) -> Mux<MockHost, MemorySettingsStore> {
    Mux::new(
        test_config(),
        host.clone(),
        MemorySettingsStore::new(),
        ProjectRegistry::new(),
    )
}

fn session_of(mux: &Mux<MockHost, MemorySettingsStore>, pane_id: PaneId) -> SessionId {
    mux.workspace().find_pane(pane_id).unwrap().1.session_id.clone()
}

/// Mount, size and acknowledge every pane
fn activate_all(mux: &mut Mux<MockHost, MemorySettingsStore>, now: Instant) {
    mux.resolve_working_directories(now);
    for pane_id in mux.sessions().pane_ids() {
        mux.mount_surface(pane_id, MockSurface::new().boxed(), now);
        mux.surface_resized(pane_id, 80, 24, now);
        let session_id = session_of(mux, pane_id);
        mux.handle_host_event(
            HostEvent::Created {
                session_id,
                replay: None,
            },
            now,
        );
    }
    mux.drain_events();
}

// ============================================================================
// Synchronous controller
// ============================================================================

#[test]
fn test_exited_pane_removed_after_grace() {
    let host = MockHost::new();
    let mut mux = new_mux(&host);
    let now = Instant::now();
    let tab = mux.workspace().tabs().active_tab_id().unwrap();
    let second = mux
        .split_pane(tab, 1, SplitDirection::Column, Placement::After, now)
        .unwrap();
    activate_all(&mut mux, now);

    let session_id = session_of(&mux, second);
    mux.handle_host_event(
        HostEvent::Exited {
            session_id: session_id.clone(),
            exit_code: Some(0),
        },
        now,
    );
    assert_eq!(mux.workspace().tabs().get(tab).unwrap().pane_count(), 2);

    mux.poll(now + test_config().timing.exit_grace());
    let events = mux.drain_events();
    assert!(events.contains(&SessionEvent::RemovalDue {
        pane_id: second,
        tab_id: tab
    }));
    assert_eq!(mux.workspace().tabs().get(tab).unwrap().pane_count(), 1);
    assert!(!mux.sessions().contains(second));
    assert!(host.log.lock().closed.contains(&session_id));
}

#[test]
fn test_restart_before_grace_keeps_pane() {
    let host = MockHost::new();
    let mut mux = new_mux(&host);
    let now = Instant::now();
    activate_all(&mut mux, now);
    let old = session_of(&mux, 1);

    mux.handle_host_event(
        HostEvent::Exited {
            session_id: old.clone(),
            exit_code: Some(1),
        },
        now,
    );
    mux.restart_pane(1, now + ms(100)).unwrap();

    let fresh = session_of(&mux, 1);
    assert_ne!(fresh, old);
    assert_eq!(mux.sessions().state(1), Some(SessionState::Created));
    assert_eq!(host.created_ids().last(), Some(&fresh));

    mux.poll(now + ms(10_000));
    assert_eq!(mux.workspace().tabs().tab_count(), 1);
    assert!(mux.restart_pane(1, now).is_err());
}

#[test]
fn test_shell_cwd_updates_pane_and_tab_title() {
    let host = MockHost::new();
    let mut mux = new_mux(&host);
    let now = Instant::now();
    activate_all(&mut mux, now);

    mux.handle_host_event(
        HostEvent::Output {
            session_id: session_of(&mux, 1),
            data: b"\x1b]7;file:///var/log\x07".to_vec(),
        },
        now,
    );

    let (tab_id, pane) = mux.workspace().find_pane(1).unwrap();
    assert_eq!(pane.working_directory.as_deref(), Some("/var/log"));
    assert_eq!(mux.workspace().tabs().get(tab_id).unwrap().title, "log");
    assert!(
        mux.drain_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::CwdChanged { pane_id: 1, .. }))
    );
    assert!(mux.next_deadline().is_some());
}

#[test]
fn test_session_activity_reaches_the_tree_but_not_the_snapshot() {
    let host = MockHost::new();
    let mut mux = new_mux(&host);
    let now = Instant::now();
    activate_all(&mut mux, now);
    assert_eq!(mux.workspace().find_pane(1).unwrap().1.last_activity, None);

    mux.handle_host_event(
        HostEvent::Output {
            session_id: session_of(&mux, 1),
            data: b"building...\n".to_vec(),
        },
        now,
    );

    let (_, pane) = mux.workspace().find_pane(1).unwrap();
    assert!(pane.last_activity.is_some());
    assert_eq!(pane.last_activity, mux.sessions().last_activity(1));

    mux.flush_snapshot().unwrap();
    let json = mux.store().read_setting(SNAPSHOT_KEY).unwrap().unwrap();
    assert!(!json.contains("ctivity"));
}

#[test]
fn test_close_tab_releases_every_session() {
    let host = MockHost::new();
    let mut mux = new_mux(&host);
    let now = Instant::now();
    let tab = mux.workspace().tabs().active_tab_id().unwrap();
    mux.split_pane(tab, 1, SplitDirection::Row, Placement::After, now);
    activate_all(&mut mux, now);

    assert!(mux.close_tab(tab, now));
    assert_eq!(host.log.lock().closed.len(), 2);
    assert!(mux.sessions().pane_ids().is_empty());
    assert!(mux.workspace().tabs().is_empty());
}

#[test]
fn test_input_requires_active_session() {
    let host = MockHost::new();
    let mut mux = new_mux(&host);
    assert!(mux.send_input(1, b"ls\n").is_err());

    activate_all(&mut mux, Instant::now());
    mux.send_input(1, b"ls\n").unwrap();
    assert_eq!(host.log.lock().writes.len(), 1);
}

// ============================================================================
// Async driver
// ============================================================================

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_driver_applies_commands_and_flushes_on_shutdown() {
    let host = MockHost::new();
    let mux = new_mux(&host);
    let (tx, rx) = mpsc::channel(16);
    let (_host_tx, host_rx) = mpsc::channel(16);

    tx.send(MuxCommand::NewTab {
        cwd: None,
        project_id: None,
    })
    .await
    .unwrap();
    tx.send(MuxCommand::SplitPane {
        tab_id: 2,
        target: 2,
        direction: SplitDirection::Row,
        placement: Placement::After,
    })
    .await
    .unwrap();
    tx.send(MuxCommand::Shutdown).await.unwrap();

    let mux = run(mux, rx, host_rx, Duration::from_millis(10)).await;

    assert_eq!(mux.workspace().tabs().tab_count(), 2);
    assert_eq!(mux.sessions().pane_ids(), vec![1, 2, 3]);

    let json = mux.store().read_setting(SNAPSHOT_KEY).unwrap().unwrap();
    let snapshot = WorkspaceSnapshot::from_json(&json).unwrap();
    assert_eq!(snapshot.tabs.len(), 2);
    assert_eq!(snapshot.active_tab_id, Some(2));
}

#[tokio::test]
async fn test_driver_stops_when_commands_close() {
    let host = MockHost::new();
    let mux = new_mux(&host);
    let (tx, rx) = mpsc::channel::<MuxCommand>(1);
    let (_host_tx, host_rx) = mpsc::channel(1);
    drop(tx);

    let mux = run(mux, rx, host_rx, Duration::from_millis(10)).await;
    assert_eq!(mux.store().write_count(), 1);
}

#[tokio::test]
async fn test_driver_creates_session_once_cwd_resolves() {
    let host = MockHost::new();
    let mux = new_mux(&host);
    let session_id = session_of(&mux, 1);
    let (tx, rx) = mpsc::channel(16);
    let (host_tx, host_rx) = mpsc::channel(16);
    let handle = tokio::spawn(run(mux, rx, host_rx, Duration::from_millis(5)));

    let surface = MockSurface::new();
    tx.send(MuxCommand::Mount {
        pane_id: 1,
        surface: surface.boxed(),
    })
    .await
    .unwrap();
    tx.send(MuxCommand::SurfaceResized {
        pane_id: 1,
        cols: 100,
        rows: 40,
    })
    .await
    .unwrap();

    wait_until(|| !host.created_ids().is_empty()).await;
    let request = host.log.lock().created[0].clone();
    assert_eq!((request.cols, request.rows), (100, 40));
    assert_eq!(request.cwd, test_config().default_working_directory());

    host_tx
        .send(HostEvent::Created {
            session_id: session_id.clone(),
            replay: None,
        })
        .await
        .unwrap();
    host_tx
        .send(HostEvent::Output {
            session_id: session_id.clone(),
            data: b"hello\n".to_vec(),
        })
        .await
        .unwrap();
    wait_until(|| host.acked_bytes(&session_id) == 6).await;
    assert_eq!(surface.output_text(), "hello\n");

    tx.send(MuxCommand::Input {
        pane_id: 1,
        data: b"exit\n".to_vec(),
    })
    .await
    .unwrap();
    wait_until(|| !host.log.lock().writes.is_empty()).await;

    tx.send(MuxCommand::Shutdown).await.unwrap();
    let mux = handle.await.unwrap();
    assert_eq!(mux.sessions().state(1), Some(SessionState::Active));
}
