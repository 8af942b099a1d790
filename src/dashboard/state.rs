use std::collections::BTreeMap;

use serde::Serialize;

use crate::{error::UnknownViewError, models::ViewId};

/// Visibility of every known chart. Starts all hidden and changes only
/// through [`ViewState::toggle`]; refreshes never touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    visible: BTreeMap<ViewId, bool>,
}

/// Read-only copy of [`ViewState`] handed to presenters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ViewSnapshot(BTreeMap<ViewId, bool>);

impl ViewState {
    pub fn new(views: impl IntoIterator<Item = ViewId>) -> Self {
        Self {
            visible: views.into_iter().map(|view| (view, false)).collect(),
        }
    }

    /// Flips `view_id` and returns its new visibility.
    pub fn toggle(&mut self, view_id: &str) -> Result<bool, UnknownViewError> {
        let view: ViewId = view_id.parse()?;
        self.toggle_view(view)
            .ok_or_else(|| UnknownViewError(view_id.to_string()))
    }

    /// Same as [`ViewState::toggle`] for an already parsed id. `None` when the
    /// view is not part of this dashboard.
    pub fn toggle_view(&mut self, view: ViewId) -> Option<bool> {
        let entry = self.visible.get_mut(&view)?;
        *entry = !*entry;
        Some(*entry)
    }

    pub fn is_visible(&self, view: ViewId) -> Option<bool> {
        self.visible.get(&view).copied()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot(self.visible.clone())
    }
}

impl ViewSnapshot {
    pub fn is_visible(&self, view: ViewId) -> bool {
        self.0.get(&view).copied().unwrap_or(false)
    }

    /// Views to draw, in display order.
    pub fn visible(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.0
            .iter()
            .filter(|(_, shown)| **shown)
            .map(|(view, _)| *view)
    }

    pub fn views(&self) -> impl Iterator<Item = (ViewId, bool)> + '_ {
        self.0.iter().map(|(view, shown)| (*view, *shown))
    }
}
