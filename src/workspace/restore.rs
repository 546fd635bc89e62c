//! Rebuild a workspace from a persisted snapshot.
//!
//! Restore is best-effort: every problem is reported as a warning and the
//! offending part is dropped. The result always has at least one tab.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::Workspace;
use super::project::ProjectRegistry;
use super::snapshot::{SnapshotTab, SnapshotTree, WorkspaceSnapshot};
use crate::pane::{PaneId, SerializedNode, deserialize_tree};
use crate::tab::{ProjectId, Tab, TabKind};

/// Restored workspace plus everything that had to be dropped or repaired
#[derive(Debug)]
pub struct RestoredWorkspace {
    pub workspace: Workspace,
    pub warnings: Vec<String>,
    /// True when nothing usable was restored and a default tab was created
    pub used_default: bool,
}

/// Restore from the raw snapshot JSON, if any.
///
/// `projects` is the current run's registry; persisted project ids are
/// remapped through their paths. `default_cwd` seeds the fallback tab.
pub fn restore_workspace(
    json: Option<&str>,
    projects: ProjectRegistry,
    default_cwd: Option<String>,
) -> RestoredWorkspace {
    let mut warnings = Vec::new();

    let snapshot = match json.map(WorkspaceSnapshot::from_json_lenient) {
        None => None,
        Some(Ok((snapshot, parse_warnings))) => {
            warnings.extend(parse_warnings);
            Some(snapshot)
        }
        Some(Err(e)) => {
            warnings.push(format!("discarding workspace snapshot: {e}"));
            None
        }
    };

    let mut workspace = Workspace::new(projects);
    if let Some(snapshot) = snapshot {
        restore_into(&mut workspace, snapshot, &mut warnings);
    }

    let used_default = workspace.tabs().is_empty();
    if used_default {
        log::info!("No tabs restored, opening a default terminal tab");
        workspace.new_terminal_tab(default_cwd, None);
    }

    for warning in &warnings {
        log::warn!("Workspace restore: {}", warning);
    }

    RestoredWorkspace {
        workspace,
        warnings,
        used_default,
    }
}

fn restore_into(workspace: &mut Workspace, snapshot: WorkspaceSnapshot, warnings: &mut Vec<String>) {
    let project_map = remap_projects(&snapshot.project_paths, workspace, warnings);

    let mut seen_tabs = HashSet::new();
    let mut used_pane_ids = HashSet::new();

    for entry in &snapshot.tabs {
        if !seen_tabs.insert(entry.id) {
            warnings.push(format!("dropping duplicate tab id {}", entry.id));
            continue;
        }

        let tab = match entry.kind {
            TabKind::Other => Some(Tab::new_other(entry.id, entry.title.clone())),
            TabKind::Terminal => match snapshot.per_tab_tree.get(&entry.id) {
                Some(tree) => restore_terminal_tab(workspace, entry, tree, &mut used_pane_ids, warnings),
                None => {
                    warnings.push(format!("dropping tab {}: no pane tree", entry.id));
                    None
                }
            },
        };

        let Some(mut tab) = tab else {
            continue;
        };
        tab.project_id = entry.project_id.as_ref().and_then(|old| {
            let mapped = project_map.get(old).cloned();
            if mapped.is_none() {
                warnings.push(format!("tab {}: unknown project {old}, dropping association", entry.id));
            }
            mapped
        });
        if entry.user_titled {
            tab.set_title(entry.title.clone());
        }
        workspace.push_tab(tab);
    }

    let orphaned = snapshot
        .per_tab_tree
        .keys()
        .filter(|id| !seen_tabs.contains(*id))
        .count();
    if orphaned > 0 {
        warnings.push(format!("ignoring {orphaned} tree(s) with no matching tab"));
    }

    let active = snapshot
        .active_tab_id
        .filter(|id| workspace.tabs().get(*id).is_some())
        .or_else(|| workspace.tabs().tabs().first().map(|t| t.id));
    if let Some(active) = active {
        workspace.switch_tab(active);
    }
    if let Some(id) = snapshot.active_tab_id
        && Some(id) != active
    {
        warnings.push(format!("active tab {id} missing, falling back to the first tab"));
    }

    let active_project = snapshot
        .active_project_id
        .as_ref()
        .and_then(|old| project_map.get(old).cloned());
    workspace.set_active_project(active_project);
}

/// Map persisted project ids onto this run's ids by path
fn remap_projects(
    project_paths: &std::collections::BTreeMap<ProjectId, String>,
    workspace: &Workspace,
    warnings: &mut Vec<String>,
) -> HashMap<ProjectId, ProjectId> {
    let mut map = HashMap::new();
    for (old_id, path) in project_paths {
        match workspace.projects().id_for_path(path) {
            Some(new_id) => {
                map.insert(old_id.clone(), new_id);
            }
            None => warnings.push(format!("project path {path} is no longer registered")),
        }
    }
    map
}

fn restore_terminal_tab(
    workspace: &mut Workspace,
    entry: &SnapshotTab,
    tree: &SnapshotTree,
    used_pane_ids: &mut HashSet<PaneId>,
    warnings: &mut Vec<String>,
) -> Option<Tab> {
    let mut root = tree.root.clone();
    let renumbered = renumber_collisions(&mut root, used_pane_ids, workspace);
    if !renumbered.is_empty() {
        warnings.push(format!(
            "tab {}: renumbered {} pane id(s) already used by another tab",
            entry.id,
            renumbered.len()
        ));
    }

    let node = match deserialize_tree(&root, entry.id, workspace.session_ids_mut()) {
        Ok(node) => node,
        Err(e) => {
            warnings.push(format!("dropping tab {}: {e}", entry.id));
            return None;
        }
    };
    used_pane_ids.extend(node.pane_ids());

    let mut tab = Tab::with_root(entry.id, node);
    let wanted = tree
        .active_pane_id
        .map(|id| renumbered.get(&id).copied().unwrap_or(id));
    if let Some(id) = wanted
        && !tab.set_active_pane(id)
    {
        warnings.push(format!(
            "tab {}: active pane {id} missing, focusing the first pane",
            entry.id
        ));
    }
    if !entry.user_titled && !entry.title.is_empty() && tab.title == "Terminal" {
        tab.title = entry.title.clone();
    }
    Some(tab)
}

/// Give fresh ids to panes whose id another tab already uses.
/// Returns old id → new id for the renumbered panes.
fn renumber_collisions(
    node: &mut SerializedNode,
    used: &HashSet<PaneId>,
    workspace: &mut Workspace,
) -> HashMap<PaneId, PaneId> {
    let mut taken: HashSet<PaneId> = used.clone();
    collect_ids(node, &mut taken);

    let mut renumbered = HashMap::new();
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        match node {
            SerializedNode::Pane { id, .. } => {
                if used.contains(id) {
                    let fresh = next_free_id(workspace, &taken);
                    taken.insert(fresh);
                    renumbered.insert(*id, fresh);
                    *id = fresh;
                }
            }
            SerializedNode::Split { children, .. } => stack.extend(children.iter_mut()),
        }
    }
    renumbered
}

fn collect_ids(node: &SerializedNode, ids: &mut HashSet<PaneId>) {
    match node {
        SerializedNode::Pane { id, .. } => {
            ids.insert(*id);
        }
        SerializedNode::Split { children, .. } => {
            for child in children {
                collect_ids(child, ids);
            }
        }
    }
}

fn next_free_id(workspace: &mut Workspace, taken: &HashSet<PaneId>) -> PaneId {
    loop {
        let id = workspace.allocate_pane_id();
        if !taken.contains(&id) {
            return id;
        }
    }
}

/// Resolve a persisted working directory, falling back when it no longer
/// exists.
pub fn validate_cwd(cwd: Option<&str>, fallback: &str) -> String {
    if let Some(dir) = cwd {
        if Path::new(dir).is_dir() {
            return dir.to_string();
        }
        log::warn!(
            "Working directory '{}' no longer exists, falling back to {}",
            dir,
            fallback
        );
    }
    fallback.to_string()
}
