//! `PaneNode`: n-ary tree of panes with `Arc`-shared subtrees.

use std::sync::Arc;

use super::common::{PaneId, SplitDirection};
use super::pane::Pane;

/// A row or column of children.
///
/// Invariants maintained by every operation in [`crate::pane::tree`]:
/// at least two children, one weight per child, weights sum to
/// [`super::common::TOTAL_WEIGHT`].
#[derive(Debug, Clone, PartialEq)]
pub struct SplitContainer {
    pub direction: SplitDirection,
    pub children: Vec<PaneNode>,
    pub sizes: Vec<f64>,
}

/// Tree node for pane layout
///
/// Cloning a node is cheap and shares the underlying subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum PaneNode {
    /// A leaf holding a single pane
    Leaf(Arc<Pane>),
    /// A container of two or more children
    Split(Arc<SplitContainer>),
}

impl PaneNode {
    /// Create a new leaf node
    pub fn leaf(pane: Pane) -> Self {
        PaneNode::Leaf(Arc::new(pane))
    }

    /// Create a new container node
    pub fn split(direction: SplitDirection, children: Vec<PaneNode>, sizes: Vec<f64>) -> Self {
        PaneNode::Split(Arc::new(SplitContainer {
            direction,
            children,
            sizes,
        }))
    }

    /// Check if this is a leaf node
    pub fn is_leaf(&self) -> bool {
        matches!(self, PaneNode::Leaf(_))
    }

    /// Get the pane if this is a leaf node
    pub fn as_pane(&self) -> Option<&Arc<Pane>> {
        match self {
            PaneNode::Leaf(pane) => Some(pane),
            PaneNode::Split(_) => None,
        }
    }

    /// Get the container if this is a split node
    pub fn as_split(&self) -> Option<&Arc<SplitContainer>> {
        match self {
            PaneNode::Leaf(_) => None,
            PaneNode::Split(container) => Some(container),
        }
    }

    /// Whether both handles point at the same allocation
    pub fn ptr_eq(&self, other: &PaneNode) -> bool {
        match (self, other) {
            (PaneNode::Leaf(a), PaneNode::Leaf(b)) => Arc::ptr_eq(a, b),
            (PaneNode::Split(a), PaneNode::Split(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Key identifying this node among its siblings: the pane id for a
    /// leaf, the id of the first (leftmost) leaf for a container.
    pub fn node_key(&self) -> PaneId {
        // Containers always have children, so the fallback is never observed
        self.first_pane().map_or(PaneId::MAX, |pane| pane.id)
    }

    /// Find a pane by id
    pub fn find_pane(&self, id: PaneId) -> Option<&Arc<Pane>> {
        match self {
            PaneNode::Leaf(pane) => (pane.id == id).then_some(pane),
            PaneNode::Split(container) => container
                .children
                .iter()
                .find_map(|child| child.find_pane(id)),
        }
    }

    /// Whether a pane with this id is in the tree
    pub fn contains_pane(&self, id: PaneId) -> bool {
        self.find_pane(id).is_some()
    }

    /// Find the pane backed by a given session
    pub fn find_pane_by_session(&self, session_id: &str) -> Option<&Arc<Pane>> {
        match self {
            PaneNode::Leaf(pane) => (pane.session_id.as_str() == session_id).then_some(pane),
            PaneNode::Split(container) => container
                .children
                .iter()
                .find_map(|child| child.find_pane_by_session(session_id)),
        }
    }

    /// Number of leaves
    pub fn pane_count(&self) -> usize {
        match self {
            PaneNode::Leaf(_) => 1,
            PaneNode::Split(container) => container.children.iter().map(Self::pane_count).sum(),
        }
    }

    /// Pane ids in left-to-right, top-to-bottom order
    pub fn pane_ids(&self) -> Vec<PaneId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<PaneId>) {
        match self {
            PaneNode::Leaf(pane) => ids.push(pane.id),
            PaneNode::Split(container) => {
                for child in &container.children {
                    child.collect_ids(ids);
                }
            }
        }
    }

    /// First leaf in depth-first order
    pub fn first_pane(&self) -> Option<&Arc<Pane>> {
        match self {
            PaneNode::Leaf(pane) => Some(pane),
            PaneNode::Split(container) => container.children.first().and_then(Self::first_pane),
        }
    }

    /// Largest pane id in the tree
    pub fn max_pane_id(&self) -> PaneId {
        self.pane_ids().into_iter().max().unwrap_or(0)
    }

    /// Depth of the deepest leaf (a lone leaf has depth 1)
    pub fn depth(&self) -> usize {
        match self {
            PaneNode::Leaf(_) => 1,
            PaneNode::Split(container) => {
                1 + container.children.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }

    /// Compare two trees by layout: topology, direction, pane ids, working
    /// directories, labels, and weights within `epsilon`. Session ids and
    /// runtime-only fields are ignored.
    pub fn layout_matches(&self, other: &PaneNode, epsilon: f64) -> bool {
        match (self, other) {
            (PaneNode::Leaf(a), PaneNode::Leaf(b)) => {
                a.id == b.id
                    && a.working_directory == b.working_directory
                    && a.custom_label == b.custom_label
            }
            (PaneNode::Split(a), PaneNode::Split(b)) => {
                a.direction == b.direction
                    && a.children.len() == b.children.len()
                    && a.sizes.len() == b.sizes.len()
                    && a.sizes
                        .iter()
                        .zip(&b.sizes)
                        .all(|(x, y)| (x - y).abs() <= epsilon)
                    && a.children
                        .iter()
                        .zip(&b.children)
                        .all(|(x, y)| x.layout_matches(y, epsilon))
            }
            _ => false,
        }
    }

    /// Check the structural invariants. Returns a description of the first
    /// violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        self.check_node(&mut seen)
    }

    fn check_node(&self, seen: &mut std::collections::HashSet<PaneId>) -> Result<(), String> {
        match self {
            PaneNode::Leaf(pane) => {
                if !seen.insert(pane.id) {
                    return Err(format!("pane {} appears more than once", pane.id));
                }
                Ok(())
            }
            PaneNode::Split(container) => {
                if container.children.len() < 2 {
                    return Err(format!(
                        "container with {} children",
                        container.children.len()
                    ));
                }
                if container.sizes.len() != container.children.len() {
                    return Err(format!(
                        "{} sizes for {} children",
                        container.sizes.len(),
                        container.children.len()
                    ));
                }
                let total: f64 = container.sizes.iter().sum();
                if (total - super::common::TOTAL_WEIGHT).abs() > 1e-6 {
                    return Err(format!("sizes sum to {total}"));
                }
                for child in &container.children {
                    child.check_node(seen)?;
                }
                Ok(())
            }
        }
    }
}
