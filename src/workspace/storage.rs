//! Settings stores backing snapshot persistence.
//!
//! `FileSettingsStore` keeps a flat JSON object at
//! `~/.config/par-mux/settings.json`; `MemorySettingsStore` is the in-process
//! variant used by tests and embedders that persist elsewhere.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::traits::SettingsStore;

/// Get the path to the default settings file
pub fn settings_path() -> PathBuf {
    par_mux_config::Config::config_dir().join("settings.json")
}

/// JSON key/value file, rewritten atomically on every write
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSettingsStore {
    /// Open the default settings file
    pub fn open_default() -> Result<Self> {
        Self::open(settings_path())
    }

    /// Open a settings file. A missing or empty file is an empty store; a
    /// corrupt file is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {:?}", path))?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse settings from {:?}", path))?
            }
        } else {
            BTreeMap::new()
        };

        log::debug!("Opened settings store {:?} ({} keys)", path, values.len());
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(&self.values).context("Failed to serialize settings")?;

        // Write to a sibling temp file then rename so a crash never leaves a
        // truncated settings file behind
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, contents)
            .with_context(|| format!("Failed to write settings to {:?}", temp_path))?;
        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace settings file {:?}", self.path))?;
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn read_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn write_setting(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

/// Settings held in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, String>,
    writes: usize,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `write_setting` calls so far
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl SettingsStore for MemorySettingsStore {
    fn read_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn write_setting(&mut self, key: &str, value: &str) -> Result<()> {
        self.writes += 1;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let temp = tempdir().unwrap();
        let store = FileSettingsStore::open(temp.path().join("settings.json")).unwrap();
        assert_eq!(store.read_setting("anything").unwrap(), None);
    }

    #[test]
    fn test_write_persists_across_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("settings.json");

        let mut store = FileSettingsStore::open(&path).unwrap();
        store.write_setting("workspace.snapshot", "{}").unwrap();
        store.write_setting("other", "x").unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = FileSettingsStore::open(&path).unwrap();
        assert_eq!(
            reopened.read_setting("workspace.snapshot").unwrap().as_deref(),
            Some("{}")
        );
        assert_eq!(reopened.read_setting("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(FileSettingsStore::open(&path).is_err());
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let mut store = MemorySettingsStore::new();
        store.write_setting("k", "v").unwrap();
        assert_eq!(store.read_setting("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.write_count(), 1);
    }
}
