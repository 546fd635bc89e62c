//! Debounced snapshot persistence.
//!
//! Every workspace mutation marks the snapshot dirty; the write happens once
//! the workspace has been quiet for the debounce period. `flush` writes
//! immediately and is used before exit.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::Workspace;
use super::capture::capture_workspace;
use super::snapshot::SNAPSHOT_KEY;
use crate::traits::SettingsStore;

/// Trailing-debounce scheduler for snapshot writes
#[derive(Debug)]
pub struct SnapshotScheduler {
    debounce: Duration,
    /// When the pending write becomes due
    deadline: Option<Instant>,
    /// Last JSON written, without its timestamp
    last_written: Option<String>,
}

impl SnapshotScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            deadline: None,
            last_written: None,
        }
    }

    /// Arm (or re-arm) the debounce
    pub fn mark_dirty(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
    }

    pub fn is_dirty(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a pending write is due at `now`. Clears the pending state
    /// when it reports true.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Write the snapshot if it differs from the last one written.
    /// Returns true if the store was written.
    pub fn persist(&mut self, workspace: &Workspace, store: &mut dyn SettingsStore) -> Result<bool> {
        let mut snapshot = capture_workspace(workspace);
        let body = snapshot.to_json().context("Failed to serialize workspace snapshot")?;
        if self.last_written.as_deref() == Some(body.as_str()) {
            log::trace!("Workspace snapshot unchanged, skipping write");
            return Ok(false);
        }

        snapshot.saved_at = Some(chrono::Utc::now().to_rfc3339());
        let stamped = snapshot.to_json().context("Failed to serialize workspace snapshot")?;
        store
            .write_setting(SNAPSHOT_KEY, &stamped)
            .context("Failed to write workspace snapshot")?;

        crate::debug_info!(
            "SNAPSHOT",
            "Saved workspace snapshot ({} tabs, {} bytes)",
            snapshot.tabs.len(),
            stamped.len()
        );
        self.last_written = Some(body);
        Ok(true)
    }

    /// Write now, bypassing the debounce
    pub fn flush(&mut self, workspace: &Workspace, store: &mut dyn SettingsStore) -> Result<bool> {
        self.deadline = None;
        self.persist(workspace, store)
    }
}
