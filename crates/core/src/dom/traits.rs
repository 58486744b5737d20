use crate::errors::CoreError;
use crate::models::panel::PanelView;

/// Where the panel currently sits relative to the anchor card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelPlacement {
    /// The host page has not rendered the anchor (yet).
    NoAnchor,
    /// Anchor present, no panel on the page.
    Missing,
    /// Panel is the anchor's immediate next sibling.
    Adjacent,
    /// Panel exists but somewhere else.
    Displaced,
}

/// Read/write contract with the host page.
///
/// Implementations own the knowledge of how the host marks up its cards;
/// when that markup changes shape, anchor lookups simply report "not present".
pub trait HostPage: Send + Sync {
    /// True once the anchor card and its container are on the page.
    fn anchor_present(&self) -> bool;

    /// Classify where the panel with `panel_id` is.
    fn placement(&self, panel_id: &str) -> PanelPlacement;

    /// Remove every element carrying `panel_id`. Returns how many were removed.
    fn remove_panel(&self, panel_id: &str) -> usize;

    /// Build `panel` and insert it as the anchor's next sibling.
    fn insert_panel(&self, panel: &PanelView) -> Result<(), CoreError>;

    /// Move the existing panel back next to the anchor without rebuilding it.
    /// Returns false when there was no panel to move.
    fn reposition_panel(&self, panel_id: &str) -> Result<bool, CoreError>;
}
