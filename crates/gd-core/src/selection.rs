//! Selection shared between the list and the map

use parking_lot::RwLock;

use crate::record::RecordId;

/// Holds the single currently selected record.
///
/// A pure state holder: no validation against the current page and no
/// side effects. Both views read it and write it through `select`/`clear`.
#[derive(Debug, Default)]
pub struct SelectionCoordinator {
    selected: RwLock<Option<RecordId>>,
}

impl SelectionCoordinator {
    /// Create a coordinator with nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently selected record id
    pub fn selected(&self) -> Option<RecordId> {
        self.selected.read().clone()
    }

    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selected.read().as_ref() == Some(id)
    }

    /// Select a record, replacing any previous selection. Returns whether it changed.
    pub fn select(&self, id: RecordId) -> bool {
        let mut selected = self.selected.write();
        if selected.as_ref() == Some(&id) {
            return false;
        }
        *selected = Some(id);
        true
    }

    /// Clear the selection. Returns whether anything was selected.
    pub fn clear(&self) -> bool {
        self.selected.write().take().is_some()
    }
}
