//! Shared integration test helpers for par-mux.
//!
//! Fakes for the collaborator traits. Each fake records what it was asked to
//! do in a shared log so tests can keep a handle after moving the fake into
//! the code under test.
//!
//! Include with `mod common;` at the top of a test file. `#[allow(dead_code)]`
//! keeps unused helpers quiet in files that only need some of them.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use par_mux::Config;
use par_mux::pane::SessionId;
use par_mux::traits::{CreateSessionRequest, PaneSurface, SessionHost};
use parking_lot::Mutex;

/// Everything a [`MockHost`] was asked to do, in order
#[derive(Debug, Default)]
pub struct HostLog {
    pub created: Vec<CreateSessionRequest>,
    pub writes: Vec<(SessionId, Vec<u8>)>,
    pub resizes: Vec<(SessionId, u16, u16)>,
    pub acks: Vec<(SessionId, usize)>,
    pub closed: Vec<SessionId>,
    /// Make the next `create_session` calls fail
    pub fail_creates: bool,
}

/// Session host fake; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    pub log: Arc<Mutex<HostLog>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_ids(&self) -> Vec<SessionId> {
        self.log
            .lock()
            .created
            .iter()
            .map(|r| r.session_id.clone())
            .collect()
    }

    pub fn acked_bytes(&self, session_id: &SessionId) -> usize {
        self.log
            .lock()
            .acks
            .iter()
            .filter(|(id, _)| id == session_id)
            .map(|(_, bytes)| bytes)
            .sum()
    }

    pub fn resizes(&self) -> Vec<(u16, u16)> {
        self.log
            .lock()
            .resizes
            .iter()
            .map(|(_, cols, rows)| (*cols, *rows))
            .collect()
    }
}

impl SessionHost for MockHost {
    fn create_session(&mut self, request: CreateSessionRequest) -> Result<()> {
        let mut log = self.log.lock();
        if log.fail_creates {
            bail!("no such shell: /bin/missing");
        }
        log.created.push(request);
        Ok(())
    }

    fn write_session(&mut self, session_id: &SessionId, data: &[u8]) -> Result<()> {
        self.log.lock().writes.push((session_id.clone(), data.to_vec()));
        Ok(())
    }

    fn resize_session(&mut self, session_id: &SessionId, cols: u16, rows: u16) -> Result<()> {
        self.log.lock().resizes.push((session_id.clone(), cols, rows));
        Ok(())
    }

    fn ack_output(&mut self, session_id: &SessionId, bytes: usize) {
        self.log.lock().acks.push((session_id.clone(), bytes));
    }

    fn close_session(&mut self, session_id: &SessionId) {
        self.log.lock().closed.push(session_id.clone());
    }
}

/// What a [`MockSurface`] has been shown
#[derive(Debug, Default)]
pub struct SurfaceState {
    pub output: Vec<u8>,
    /// Counts newlines so shell markers get plausible line numbers
    pub cursor_line: usize,
    pub scrollback_lines: usize,
}

/// Rendering surface fake; clones share the same state
#[derive(Debug, Clone, Default)]
pub struct MockSurface {
    pub state: Arc<Mutex<SurfaceState>>,
}

impl MockSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scrollback(lines: usize) -> Self {
        let surface = Self::default();
        surface.state.lock().scrollback_lines = lines;
        surface
    }

    pub fn boxed(&self) -> Box<dyn PaneSurface> {
        Box::new(self.clone())
    }

    pub fn output(&self) -> Vec<u8> {
        self.state.lock().output.clone()
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output()).to_string()
    }
}

impl PaneSurface for MockSurface {
    fn apply_output(&mut self, data: &[u8]) {
        let mut state = self.state.lock();
        state.output.extend_from_slice(data);
        state.cursor_line += data.iter().filter(|b| **b == b'\n').count();
    }

    fn cursor_line(&self) -> usize {
        self.state.lock().cursor_line
    }

    fn scrollback_lines(&self) -> usize {
        self.state.lock().scrollback_lines
    }
}

/// Config with the default timing constants and a working directory that
/// exists on every test machine
pub fn test_config() -> Config {
    Config {
        default_working_directory: Some(std::env::temp_dir().to_string_lossy().to_string()),
        ..Config::default()
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
