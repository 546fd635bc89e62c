//! Core types for the split tree.
//!
//! Sub-modules:
//! - [`common`]: `SplitDirection`, `Placement`, `SessionId` and its allocator
//! - [`pane`]: `Pane` leaf payload
//! - [`pane_node`]: `PaneNode` / `SplitContainer` and read-only queries

mod common;
mod pane;
mod pane_node;

#[cfg(test)]
mod tests;

pub use common::{PaneId, Placement, SessionId, SessionIdAllocator, SplitDirection, TOTAL_WEIGHT};
pub use pane::Pane;
pub(crate) use pane::directory_label;
pub use pane_node::{PaneNode, SplitContainer};
