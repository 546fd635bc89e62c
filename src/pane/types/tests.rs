//! Tests for pane types and read-only tree queries.

use super::common::{PaneId, SessionId, SessionIdAllocator, SplitDirection};
use super::pane::{Pane, directory_label};
use super::pane_node::PaneNode;

fn leaf(id: PaneId) -> PaneNode {
    PaneNode::leaf(Pane::new(id, SessionId::new(format!("s{id}")), None))
}

#[test]
fn test_session_id_allocator_format() {
    let mut ids = SessionIdAllocator::new();
    assert_eq!(ids.allocate(1, 3).as_str(), "tab1-pane3-0");
    assert_eq!(ids.allocate(1, 3).as_str(), "tab1-pane3-1");
    assert_eq!(ids.allocate(2, 1).to_string(), "tab2-pane1-2");
}

#[test]
fn test_split_direction_serde() {
    assert_eq!(serde_json::to_string(&SplitDirection::Row).unwrap(), "\"row\"");
    let dir: SplitDirection = serde_json::from_str("\"column\"").unwrap();
    assert_eq!(dir, SplitDirection::Column);
}

#[test]
fn test_queries_on_nested_tree() {
    let tree = PaneNode::split(
        SplitDirection::Row,
        vec![
            leaf(1),
            PaneNode::split(SplitDirection::Column, vec![leaf(4), leaf(2)], vec![50.0, 50.0]),
        ],
        vec![40.0, 60.0],
    );

    assert_eq!(tree.pane_count(), 3);
    assert_eq!(tree.pane_ids(), vec![1, 4, 2]);
    assert_eq!(tree.max_pane_id(), 4);
    assert_eq!(tree.depth(), 3);
    assert_eq!(tree.node_key(), 1);
    assert_eq!(tree.as_split().unwrap().children[1].node_key(), 4);
    assert!(tree.contains_pane(2));
    assert!(!tree.contains_pane(3));
    assert_eq!(tree.find_pane_by_session("s4").unwrap().id, 4);
    assert_eq!(tree.first_pane().unwrap().id, 1);
    tree.check_invariants().unwrap();
}

#[test]
fn test_check_invariants_reports_violations() {
    let duplicate = PaneNode::split(SplitDirection::Row, vec![leaf(1), leaf(1)], vec![50.0, 50.0]);
    assert!(duplicate.check_invariants().is_err());

    let lonely = PaneNode::split(SplitDirection::Row, vec![leaf(1)], vec![100.0]);
    assert!(lonely.check_invariants().is_err());

    let bad_sum = PaneNode::split(SplitDirection::Row, vec![leaf(1), leaf(2)], vec![50.0, 10.0]);
    assert!(bad_sum.check_invariants().is_err());
}

#[test]
fn test_clone_shares_allocation() {
    let tree = leaf(1);
    let copy = tree.clone();
    assert!(tree.ptr_eq(&copy));
    assert!(!tree.ptr_eq(&leaf(1)));
    assert_eq!(tree, leaf(1));
}

#[test]
fn test_display_label_precedence() {
    let mut pane = Pane::new(1, SessionId::new("s"), Some("/home/me/project/".to_string()));
    assert_eq!(pane.display_label(), "project");
    pane.process_name = Some("vim".to_string());
    assert_eq!(pane.display_label(), "vim");
    pane.custom_label = Some("editor".to_string());
    assert_eq!(pane.display_label(), "editor");

    let bare = Pane::new(7, SessionId::new("s"), None);
    assert_eq!(bare.display_label(), "Pane 7");
}

#[test]
fn test_directory_label() {
    assert_eq!(directory_label("/"), Some("/".to_string()));
    assert_eq!(directory_label("/usr/local"), Some("local".to_string()));
    assert_eq!(directory_label(""), None);
}
