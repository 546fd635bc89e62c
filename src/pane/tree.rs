//! Pure mutation algebra over [`PaneNode`] trees.
//!
//! Every function takes a root by reference and returns a new root. Subtrees
//! that do not lie on the path to a change are shared with the input, which
//! is what [`changed_pane_ids`] relies on. Operations that cannot apply
//! (unknown id, invalid sizes) return the input unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{Pane, PaneId, PaneNode, Placement, SplitContainer, SplitDirection, TOTAL_WEIGHT};

/// Split `target_id` and place `new_pane` after it.
///
/// See [`insert_split_at`].
pub fn insert_split(
    tree: &PaneNode,
    target_id: PaneId,
    new_pane: Pane,
    direction: SplitDirection,
) -> PaneNode {
    insert_split_at(tree, target_id, new_pane, direction, Placement::After)
}

/// Split the leaf `target_id` along `direction`.
///
/// When the target's parent already runs along `direction`, the new pane
/// becomes a sibling and the target's weight is halved between the two.
/// Otherwise the target is wrapped in a new two-child container at 50/50.
///
/// [`remove_pane`] undoes a wrapping insert exactly. After a sibling insert
/// it restores the topology, but the freed weight is spread over every
/// sibling, so `[50, 50]` split at the first child and removed again comes
/// back as roughly `[33.3, 66.7]`. Callers that need the old weights back
/// should keep the previous tree.
pub fn insert_split_at(
    tree: &PaneNode,
    target_id: PaneId,
    new_pane: Pane,
    direction: SplitDirection,
    placement: Placement,
) -> PaneNode {
    if tree.contains_pane(new_pane.id) {
        log::warn!("Refusing to insert pane {}: id already in tree", new_pane.id);
        return tree.clone();
    }
    let new_leaf = PaneNode::leaf(new_pane);
    match insert_node(tree, target_id, &new_leaf, direction, placement) {
        Some(updated) => updated,
        None => {
            log::debug!("insert_split: target pane {} not found", target_id);
            tree.clone()
        }
    }
}

fn insert_node(
    node: &PaneNode,
    target_id: PaneId,
    new_leaf: &PaneNode,
    direction: SplitDirection,
    placement: Placement,
) -> Option<PaneNode> {
    match node {
        PaneNode::Leaf(pane) => {
            if pane.id != target_id {
                return None;
            }
            let children = match placement {
                Placement::After => vec![node.clone(), new_leaf.clone()],
                Placement::Before => vec![new_leaf.clone(), node.clone()],
            };
            let half = TOTAL_WEIGHT / 2.0;
            Some(PaneNode::split(direction, children, vec![half, half]))
        }
        PaneNode::Split(container) => {
            if container.direction == direction
                && let Some(index) = container
                    .children
                    .iter()
                    .position(|child| child.as_pane().is_some_and(|p| p.id == target_id))
            {
                let mut children = container.children.clone();
                let mut sizes = container.sizes.clone();
                let half = sizes[index] / 2.0;
                sizes[index] = half;
                let at = match placement {
                    Placement::After => index + 1,
                    Placement::Before => index,
                };
                children.insert(at, new_leaf.clone());
                sizes.insert(at, half);
                return Some(PaneNode::split(container.direction, children, sizes));
            }

            container
                .children
                .iter()
                .enumerate()
                .find_map(|(index, child)| {
                    insert_node(child, target_id, new_leaf, direction, placement)
                        .map(|updated| with_child(container, index, updated))
                })
        }
    }
}

/// Copy of `container` with one child replaced; siblings are shared.
fn with_child(container: &SplitContainer, index: usize, child: PaneNode) -> PaneNode {
    let mut children = container.children.clone();
    children[index] = child;
    PaneNode::split(container.direction, children, container.sizes.clone())
}

enum Removal {
    NotFound,
    Emptied,
    Replaced(PaneNode),
}

/// Remove the leaf `pane_id`.
///
/// The removed weight is redistributed over the remaining siblings in
/// proportion to their current weights. A container left with one child is
/// replaced by that child. Returns `None` when the last pane was removed,
/// and the input unchanged when `pane_id` is absent.
pub fn remove_pane(tree: &PaneNode, pane_id: PaneId) -> Option<PaneNode> {
    match remove_node(tree, pane_id) {
        Removal::NotFound => Some(tree.clone()),
        Removal::Emptied => None,
        Removal::Replaced(updated) => Some(updated),
    }
}

fn remove_node(node: &PaneNode, pane_id: PaneId) -> Removal {
    let container = match node {
        PaneNode::Leaf(pane) => {
            return if pane.id == pane_id {
                Removal::Emptied
            } else {
                Removal::NotFound
            };
        }
        PaneNode::Split(container) => container,
    };

    for (index, child) in container.children.iter().enumerate() {
        match remove_node(child, pane_id) {
            Removal::NotFound => continue,
            Removal::Replaced(updated) => {
                return Removal::Replaced(with_child(container, index, updated));
            }
            Removal::Emptied => {
                let mut children = container.children.clone();
                let mut sizes = container.sizes.clone();
                children.remove(index);
                let removed = sizes.remove(index);
                redistribute(&mut sizes, removed);

                return match children.len() {
                    0 => Removal::Emptied,
                    1 => Removal::Replaced(children.remove(0)),
                    _ => Removal::Replaced(PaneNode::split(container.direction, children, sizes)),
                };
            }
        }
    }
    Removal::NotFound
}

/// Spread `removed` over `sizes` proportionally: `w' = w + removed * w / sum`.
fn redistribute(sizes: &mut [f64], removed: f64) {
    if sizes.is_empty() {
        return;
    }
    let remaining: f64 = sizes.iter().sum();
    if remaining > 0.0 {
        for size in sizes.iter_mut() {
            *size += removed * *size / remaining;
        }
    } else {
        let each = (remaining + removed) / sizes.len() as f64;
        sizes.fill(each);
    }
}

/// Exchange the panes at the positions of `a` and `b`.
///
/// Weights stay with the positions, not the panes.
pub fn swap_panes(tree: &PaneNode, a: PaneId, b: PaneId) -> PaneNode {
    if a == b {
        return tree.clone();
    }
    let (Some(pane_a), Some(pane_b)) = (tree.find_pane(a), tree.find_pane(b)) else {
        log::debug!("swap_panes: pane {} or {} not found", a, b);
        return tree.clone();
    };

    let replacements = HashMap::from([(a, Arc::clone(pane_b)), (b, Arc::clone(pane_a))]);
    replace_leaves(tree, &replacements).unwrap_or_else(|| tree.clone())
}

/// Replace leaves by id. Returns `None` when nothing was replaced so the
/// caller can keep the original allocation.
fn replace_leaves(node: &PaneNode, replacements: &HashMap<PaneId, Arc<Pane>>) -> Option<PaneNode> {
    match node {
        PaneNode::Leaf(pane) => replacements
            .get(&pane.id)
            .map(|replacement| PaneNode::Leaf(Arc::clone(replacement))),
        PaneNode::Split(container) => {
            let mut changed = false;
            let children: Vec<PaneNode> = container
                .children
                .iter()
                .map(|child| match replace_leaves(child, replacements) {
                    Some(updated) => {
                        changed = true;
                        updated
                    }
                    None => child.clone(),
                })
                .collect();
            changed.then(|| PaneNode::split(container.direction, children, container.sizes.clone()))
        }
    }
}

/// Move `dragged_id` next to `target_id`, placed after it.
///
/// See [`dock_pane_at`].
pub fn dock_pane(
    tree: &PaneNode,
    dragged_id: PaneId,
    target_id: PaneId,
    direction: SplitDirection,
) -> PaneNode {
    dock_pane_at(tree, dragged_id, target_id, direction, Placement::After)
}

/// Remove `dragged_id` and re-insert it beside `target_id`.
///
/// The pane keeps its session. Docking a pane onto itself, or with either id
/// missing, is a no-op.
pub fn dock_pane_at(
    tree: &PaneNode,
    dragged_id: PaneId,
    target_id: PaneId,
    direction: SplitDirection,
    placement: Placement,
) -> PaneNode {
    if dragged_id == target_id || !tree.contains_pane(target_id) {
        return tree.clone();
    }
    let Some(dragged) = tree.find_pane(dragged_id) else {
        return tree.clone();
    };
    let dragged = (**dragged).clone();

    // The target is still present, so removal cannot empty the tree
    let Some(without) = remove_pane(tree, dragged_id) else {
        return tree.clone();
    };
    insert_split_at(&without, target_id, dragged, direction, placement)
}

/// Set the weights of the container whose direct children are keyed by
/// `ordered_child_ids` (see [`PaneNode::node_key`]).
///
/// Sizes are normalized to sum to 100. Invalid input leaves the tree
/// unchanged: a length mismatch, a negative or non-finite weight, or an
/// all-zero vector.
pub fn update_sizes(tree: &PaneNode, ordered_child_ids: &[PaneId], new_sizes: &[f64]) -> PaneNode {
    if ordered_child_ids.len() != new_sizes.len() {
        log::debug!(
            "update_sizes: {} ids but {} sizes",
            ordered_child_ids.len(),
            new_sizes.len()
        );
        return tree.clone();
    }
    let Some(normalized) = normalize_sizes(new_sizes) else {
        log::debug!("update_sizes: rejecting sizes {:?}", new_sizes);
        return tree.clone();
    };
    resize_node(tree, ordered_child_ids, &normalized).unwrap_or_else(|| tree.clone())
}

fn resize_node(node: &PaneNode, ordered_child_ids: &[PaneId], sizes: &[f64]) -> Option<PaneNode> {
    let PaneNode::Split(container) = node else {
        return None;
    };

    let matches = container.children.len() == ordered_child_ids.len()
        && container
            .children
            .iter()
            .zip(ordered_child_ids)
            .all(|(child, id)| child.node_key() == *id);
    if matches {
        return Some(PaneNode::split(
            container.direction,
            container.children.clone(),
            sizes.to_vec(),
        ));
    }

    container
        .children
        .iter()
        .enumerate()
        .find_map(|(index, child)| {
            resize_node(child, ordered_child_ids, sizes)
                .map(|updated| with_child(container, index, updated))
        })
}

/// Scale `sizes` to sum to [`TOTAL_WEIGHT`]. `None` if any weight is
/// negative or non-finite, or all are zero.
pub(crate) fn normalize_sizes(sizes: &[f64]) -> Option<Vec<f64>> {
    if sizes.is_empty() || sizes.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return None;
    }
    let total: f64 = sizes.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    Some(sizes.iter().map(|s| s * TOTAL_WEIGHT / total).collect())
}

/// Equal weights for `count` children
pub(crate) fn equal_sizes(count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    vec![TOTAL_WEIGHT / count as f64; count]
}

/// All panes in depth-first, left-to-right order
pub fn flatten_panes(tree: &PaneNode) -> Vec<Arc<Pane>> {
    let mut panes = Vec::with_capacity(tree.pane_count());
    let mut stack = vec![tree];
    while let Some(node) = stack.pop() {
        match node {
            PaneNode::Leaf(pane) => panes.push(Arc::clone(pane)),
            PaneNode::Split(container) => stack.extend(container.children.iter().rev()),
        }
    }
    panes
}

/// Replace the payload of `pane_id` with `f(current)`.
///
/// The id cannot be changed this way; it is restored if `f` alters it.
pub fn update_pane(tree: &PaneNode, pane_id: PaneId, f: impl FnOnce(&Pane) -> Pane) -> PaneNode {
    let Some(current) = tree.find_pane(pane_id) else {
        return tree.clone();
    };
    let mut updated = f(current.as_ref());
    updated.id = pane_id;

    let replacements = HashMap::from([(pane_id, Arc::new(updated))]);
    replace_leaves(tree, &replacements).unwrap_or_else(|| tree.clone())
}

/// Ids of panes that were added, removed, or whose leaf allocation changed
/// between `old` and `new`. Sorted ascending.
pub fn changed_pane_ids(old: Option<&PaneNode>, new: Option<&PaneNode>) -> Vec<PaneId> {
    let old_panes = leaf_map(old);
    let new_panes = leaf_map(new);

    let mut changed: Vec<PaneId> = old_panes
        .iter()
        .filter(|(id, pane)| {
            new_panes
                .get(*id)
                .is_none_or(|other| !Arc::ptr_eq(pane, other))
        })
        .map(|(id, _)| *id)
        .chain(
            new_panes
                .keys()
                .filter(|id| !old_panes.contains_key(*id))
                .copied(),
        )
        .collect();
    changed.sort_unstable();
    changed
}

fn leaf_map(tree: Option<&PaneNode>) -> HashMap<PaneId, Arc<Pane>> {
    tree.map(flatten_panes)
        .unwrap_or_default()
        .into_iter()
        .map(|pane| (pane.id, pane))
        .collect()
}
