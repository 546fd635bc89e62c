//! Persisted form of a pane tree.
//!
//! The serialized tree keeps layout and per-pane metadata but never session
//! ids. [`deserialize_tree`] repairs what it can (empty or single-child
//! containers, bad weights) and rejects what it cannot (duplicate ids).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tree::{equal_sizes, normalize_sizes};
use super::types::{Pane, PaneId, PaneNode, SessionIdAllocator, SplitDirection};
use par_mux_config::TabId;

/// Nesting deeper than this is treated as corrupt data.
pub const MAX_TREE_DEPTH: usize = 64;

/// Serialized node, tagged by `"type"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SerializedNode {
    #[serde(rename_all = "camelCase")]
    Pane {
        id: PaneId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_label: Option<String>,
    },
    Split {
        direction: SplitDirection,
        #[serde(default)]
        children: Vec<SerializedNode>,
        #[serde(default)]
        sizes: Vec<f64>,
    },
}

/// Reasons a serialized tree cannot be restored
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("pane id {0} appears more than once")]
    DuplicatePaneId(PaneId),

    #[error("tree contains no panes")]
    Empty,

    #[error("tree nesting exceeds {} levels", MAX_TREE_DEPTH)]
    TooDeep,
}

/// Convert a live tree into its persisted form
pub fn serialize_tree(tree: &PaneNode) -> SerializedNode {
    match tree {
        PaneNode::Leaf(pane) => SerializedNode::Pane {
            id: pane.id,
            cwd: pane.working_directory.clone(),
            custom_label: pane.custom_label.clone(),
        },
        PaneNode::Split(container) => SerializedNode::Split {
            direction: container.direction,
            children: container.children.iter().map(serialize_tree).collect(),
            sizes: container.sizes.clone(),
        },
    }
}

/// Rebuild a live tree, allocating a fresh session id for every pane.
///
/// Repairs applied along the way:
/// - containers with no children are dropped
/// - containers with one child are replaced by that child
/// - sizes of the wrong length, negative, non-finite, or all zero become
///   equal weights; otherwise they are renormalized to sum to 100
pub fn deserialize_tree(
    node: &SerializedNode,
    tab_id: TabId,
    session_ids: &mut SessionIdAllocator,
) -> Result<PaneNode, TreeError> {
    let mut seen = std::collections::HashSet::new();
    check_ids(node, &mut seen, 1)?;
    build_node(node, tab_id, session_ids).ok_or(TreeError::Empty)
}

fn check_ids(
    node: &SerializedNode,
    seen: &mut std::collections::HashSet<PaneId>,
    depth: usize,
) -> Result<(), TreeError> {
    if depth > MAX_TREE_DEPTH {
        return Err(TreeError::TooDeep);
    }
    match node {
        SerializedNode::Pane { id, .. } => {
            if !seen.insert(*id) {
                return Err(TreeError::DuplicatePaneId(*id));
            }
            Ok(())
        }
        SerializedNode::Split { children, .. } => children
            .iter()
            .try_for_each(|child| check_ids(child, seen, depth + 1)),
    }
}

fn build_node(
    node: &SerializedNode,
    tab_id: TabId,
    session_ids: &mut SessionIdAllocator,
) -> Option<PaneNode> {
    match node {
        SerializedNode::Pane {
            id,
            cwd,
            custom_label,
        } => {
            let mut pane = Pane::new(*id, session_ids.allocate(tab_id, *id), cwd.clone());
            pane.custom_label = custom_label.clone();
            Some(PaneNode::leaf(pane))
        }
        SerializedNode::Split {
            direction,
            children,
            sizes,
        } => {
            let sizes_valid = sizes.len() == children.len();
            let mut kept_children = Vec::with_capacity(children.len());
            let mut kept_sizes = Vec::with_capacity(children.len());
            for (index, child) in children.iter().enumerate() {
                if let Some(built) = build_node(child, tab_id, session_ids) {
                    kept_children.push(built);
                    if sizes_valid {
                        kept_sizes.push(sizes[index]);
                    }
                } else {
                    log::debug!("Dropping empty container from restored tree");
                }
            }

            match kept_children.len() {
                0 => None,
                1 => kept_children.pop(),
                count => {
                    let sizes = if sizes_valid {
                        normalize_sizes(&kept_sizes)
                    } else {
                        None
                    }
                    .unwrap_or_else(|| {
                        log::debug!("Replacing invalid sizes {:?} with equal weights", sizes);
                        equal_sizes(count)
                    });
                    Some(PaneNode::split(*direction, kept_children, sizes))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::SessionId;

    fn pane(id: PaneId) -> SerializedNode {
        SerializedNode::Pane {
            id,
            cwd: Some(format!("/p{id}")),
            custom_label: None,
        }
    }

    #[test]
    fn test_json_shape() {
        let node = SerializedNode::Split {
            direction: SplitDirection::Row,
            children: vec![
                pane(1),
                SerializedNode::Pane {
                    id: 2,
                    cwd: None,
                    custom_label: Some("logs".to_string()),
                },
            ],
            sizes: vec![50.0, 50.0],
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "split",
                "direction": "row",
                "children": [
                    {"type": "pane", "id": 1, "cwd": "/p1"},
                    {"type": "pane", "id": 2, "customLabel": "logs"}
                ],
                "sizes": [50.0, 50.0]
            })
        );
    }

    #[test]
    fn test_activity_is_not_persisted() {
        let live = Pane {
            last_activity: Some(chrono::Utc::now()),
            ..Pane::new(7, SessionId::new("tab1-pane7-0"), Some("/srv".to_string()))
        };
        let node = serialize_tree(&PaneNode::leaf(live));
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            serde_json::json!({"type": "pane", "id": 7, "cwd": "/srv"})
        );

        let mut ids = SessionIdAllocator::new();
        let restored = deserialize_tree(&node, 1, &mut ids).unwrap();
        assert_eq!(restored.find_pane(7).unwrap().last_activity, None);
    }

    #[test]
    fn test_fresh_session_ids() {
        let mut ids = SessionIdAllocator::new();
        let tree = deserialize_tree(&pane(5), 3, &mut ids).unwrap();
        assert_eq!(tree.find_pane(5).unwrap().session_id.as_str(), "tab3-pane5-0");
        assert_eq!(tree.find_pane(5).unwrap().working_directory.as_deref(), Some("/p5"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let node = SerializedNode::Split {
            direction: SplitDirection::Column,
            children: vec![pane(1), pane(1)],
            sizes: vec![50.0, 50.0],
        };
        let mut ids = SessionIdAllocator::new();
        assert_eq!(
            deserialize_tree(&node, 1, &mut ids).unwrap_err(),
            TreeError::DuplicatePaneId(1)
        );
    }

    #[test]
    fn test_single_child_and_empty_containers_collapse() {
        let node = SerializedNode::Split {
            direction: SplitDirection::Row,
            children: vec![
                SerializedNode::Split {
                    direction: SplitDirection::Column,
                    children: vec![],
                    sizes: vec![],
                },
                SerializedNode::Split {
                    direction: SplitDirection::Column,
                    children: vec![pane(2)],
                    sizes: vec![100.0],
                },
                pane(3),
            ],
            sizes: vec![20.0, 30.0, 50.0],
        };
        let mut ids = SessionIdAllocator::new();
        let tree = deserialize_tree(&node, 1, &mut ids).unwrap();

        tree.check_invariants().unwrap();
        assert_eq!(tree.pane_ids(), vec![2, 3]);
        let sizes = &tree.as_split().unwrap().sizes;
        assert!((sizes[0] - 37.5).abs() < 1e-9);
        assert!((sizes[1] - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_bad_sizes_become_equal() {
        let node = SerializedNode::Split {
            direction: SplitDirection::Row,
            children: vec![pane(1), pane(2), pane(3)],
            sizes: vec![10.0, -4.0, 1.0],
        };
        let mut ids = SessionIdAllocator::new();
        let tree = deserialize_tree(&node, 1, &mut ids).unwrap();
        for size in &tree.as_split().unwrap().sizes {
            assert!((size - 100.0 / 3.0).abs() < 1e-9);
        }

        let mismatched = SerializedNode::Split {
            direction: SplitDirection::Row,
            children: vec![pane(1), pane(2)],
            sizes: vec![100.0],
        };
        let tree = deserialize_tree(&mismatched, 1, &mut ids).unwrap();
        assert_eq!(tree.as_split().unwrap().sizes, vec![50.0, 50.0]);
    }

    #[test]
    fn test_empty_tree_is_error() {
        let node = SerializedNode::Split {
            direction: SplitDirection::Row,
            children: vec![],
            sizes: vec![],
        };
        let mut ids = SessionIdAllocator::new();
        assert_eq!(deserialize_tree(&node, 1, &mut ids).unwrap_err(), TreeError::Empty);
    }

    #[test]
    fn test_excessive_depth_rejected() {
        let mut node = pane(0);
        for id in 1..=(MAX_TREE_DEPTH as PaneId + 1) {
            node = SerializedNode::Split {
                direction: SplitDirection::Row,
                children: vec![node, pane(id)],
                sizes: vec![50.0, 50.0],
            };
        }
        let mut ids = SessionIdAllocator::new();
        assert_eq!(deserialize_tree(&node, 1, &mut ids).unwrap_err(), TreeError::TooDeep);
    }

    #[test]
    fn test_unknown_type_fails_to_parse() {
        let result: Result<SerializedNode, _> =
            serde_json::from_str(r#"{"type":"widget","id":1}"#);
        assert!(result.is_err());
    }
}
