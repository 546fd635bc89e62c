//! Project associations for tabs.
//!
//! Project ids are random per run; only the project path is stable, so
//! snapshots carry a path table and restore remaps through it.

use par_mux_config::ProjectId;
use uuid::Uuid;

/// A project known to the current run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    pub path: String,
}

/// Registry mapping project ids to paths
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: Vec<Project>,
}

fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { path } else { trimmed }
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project path, returning its id. Registering a known path
    /// returns the existing id.
    pub fn register(&mut self, path: &str) -> ProjectId {
        let path = normalize_path(path);
        if let Some(id) = self.id_for_path(path) {
            return id;
        }
        let id = Uuid::new_v4().to_string();
        log::debug!("Registered project {} at {}", id, path);
        self.projects.push(Project {
            id: id.clone(),
            path: path.to_string(),
        });
        id
    }

    pub fn id_for_path(&self, path: &str) -> Option<ProjectId> {
        let path = normalize_path(path);
        self.projects
            .iter()
            .find(|p| p.path == path)
            .map(|p| p.id.clone())
    }

    pub fn path_for(&self, id: &str) -> Option<&str> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.path.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.path_for(id).is_some()
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.projects.len();
        self.projects.retain(|p| p.id != id);
        self.projects.len() != before
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
