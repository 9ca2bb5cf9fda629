//! Viewer actions
//!
//! Toolbar, menu, keyboard and canvas interactions all resolve to one of
//! these before reaching the session.

use super::document::DocumentFormat;
use crate::config::ThemeVariant;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the document text and rebuild
    SetText(String),
    /// Run a search; an empty query clears it
    Search(String),
    /// Focus the next search match
    NextMatch,
    ClearSearch,
    /// Whole-graph collapse/expand toggle
    ToggleCollapseAll,
    ExpandAll,
    CollapseAll,
    /// Flip one container
    ToggleNode(String),
    RotateLayout,
    SetShowCounts(bool),
    SetTheme(ThemeVariant),
    /// Reinterpret the current text as another format
    SetFormat(DocumentFormat),
    /// Rewrite the current text in another format
    ConvertTo(DocumentFormat),
    /// Select a node for the details panel
    Select(Option<String>),
    FitView,
}

impl Action {
    /// Whether the action changes node sizes and needs a settled relayout
    pub fn changes_geometry(&self) -> bool {
        matches!(self, Action::SetShowCounts(_) | Action::SetTheme(_))
    }
}
