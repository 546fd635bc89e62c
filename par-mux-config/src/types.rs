//! Identifier types shared across the par-mux crates.

/// Unique identifier for a pane within a tab's split tree
pub type PaneId = u64;

/// Unique identifier for a workspace tab
pub type TabId = u64;

/// Identifier of a project association.
///
/// Project ids are issued fresh on every run and are only meaningful together
/// with the project path they were issued for.
pub type ProjectId = String;
