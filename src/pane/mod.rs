//! Split-tree engine.
//!
//! A tab's layout is an immutable n-ary tree of panes:
//! - `Pane`: a leaf, one terminal session plus its display metadata
//! - `SplitContainer`: a row or column of two or more children with weights
//! - `PaneNode`: either of the above, shared through `Arc`
//!
//! Every mutation in [`tree`] returns a new root and reuses untouched
//! subtrees, so `Arc::ptr_eq` tells observers exactly which panes changed.

pub mod serialize;
pub mod tree;
mod types;

pub use serialize::{SerializedNode, TreeError, deserialize_tree, serialize_tree};
pub use tree::{
    changed_pane_ids, dock_pane, dock_pane_at, flatten_panes, insert_split, insert_split_at,
    remove_pane, swap_panes, update_pane, update_sizes,
};
pub(crate) use types::directory_label;
pub use types::{
    Pane, PaneId, PaneNode, Placement, SessionId, SessionIdAllocator, SplitContainer,
    SplitDirection, TOTAL_WEIGHT,
};
