//! Capture the workspace into a snapshot

use super::Workspace;
use super::snapshot::{SnapshotTab, SnapshotTree, WorkspaceSnapshot};
use crate::pane::serialize_tree;

/// Capture the current workspace. `saved_at` is left empty; the writer
/// stamps it.
pub fn capture_workspace(workspace: &Workspace) -> WorkspaceSnapshot {
    let mut snapshot = WorkspaceSnapshot {
        active_tab_id: workspace.tabs().active_tab_id(),
        active_project_id: workspace.active_project_id().cloned(),
        ..WorkspaceSnapshot::default()
    };

    for tab in workspace.tabs().tabs() {
        snapshot.tabs.push(SnapshotTab {
            id: tab.id,
            kind: tab.kind,
            title: tab.title.clone(),
            user_titled: tab.user_titled,
            project_id: tab.project_id.clone(),
        });

        if let Some(tree) = &tab.tree {
            snapshot.per_tab_tree.insert(
                tab.id,
                SnapshotTree {
                    root: serialize_tree(tree),
                    active_pane_id: tab.active_pane_id,
                },
            );
        }
    }

    // Only paths of projects something still refers to
    let referenced = snapshot
        .tabs
        .iter()
        .filter_map(|t| t.project_id.as_ref())
        .chain(snapshot.active_project_id.as_ref());
    for id in referenced {
        if let Some(path) = workspace.projects().path_for(id) {
            snapshot.project_paths.insert(id.clone(), path.to_string());
        }
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::{Placement, SplitDirection};
    use crate::workspace::ProjectRegistry;

    #[test]
    fn test_capture_strips_runtime_fields() {
        let mut projects = ProjectRegistry::new();
        let project = projects.register("/src/app");
        projects.register("/src/unused");

        let mut ws = crate::workspace::Workspace::new(projects);
        let (tab, root) = ws.new_terminal_tab(Some("/src/app".to_string()), Some(project.clone()));
        ws.split_pane(tab, root.id, SplitDirection::Row, Placement::After, None);
        ws.update_pane(root.id, |p| crate::pane::Pane {
            custom_label: Some("server".to_string()),
            process_name: Some("cargo".to_string()),
            ..p.clone()
        });

        let snapshot = capture_workspace(&ws);
        assert_eq!(snapshot.tabs.len(), 1);
        assert_eq!(snapshot.tabs[0].project_id.as_ref(), Some(&project));
        assert_eq!(snapshot.project_paths.len(), 1);
        assert_eq!(snapshot.project_paths[&project], "/src/app");

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"customLabel\":\"server\""));
        assert!(!json.contains("cargo"));
        assert!(!json.contains("session"));
    }
}
