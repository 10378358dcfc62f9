use crate::models::SelectionEntry;
use indexmap::IndexSet;

/// The set of (cleaner, option) pairs the user has ticked.
///
/// Pure state with no I/O. It is owned by the UI thread, so toggles and snapshots are
/// linearized by construction and need no locking. Entries are unique per pair; snapshots
/// list them in the order they were first selected.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    entries: IndexSet<SelectionEntry>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select or deselect one option. Repeating the same call is a no-op.
    ///
    /// # Returns
    /// `true` if the set changed
    pub fn toggle(&mut self, cleaner_id: &str, option_id: &str, selected: bool) -> bool {
        let entry = SelectionEntry::new(cleaner_id, option_id);
        if selected {
            self.entries.insert(entry)
        } else {
            // shift_remove keeps the remaining entries in selection order
            self.entries.shift_remove(&entry)
        }
    }

    /// Defensive copy of the current selection
    pub fn snapshot(&self) -> Vec<SelectionEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn is_selected(&self, cleaner_id: &str, option_id: &str) -> bool {
        self.entries
            .contains(&SelectionEntry::new(cleaner_id, option_id))
    }

    /// Empty the selection
    ///
    /// # Returns
    /// Number of entries that were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
