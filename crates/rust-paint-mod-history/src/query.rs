//! Read-only projection of the history for the UI timeline.
use chrono::{DateTime, Local};

use crate::budget::MemoryUsage;
use crate::entry::{EntryId, EntryKind, HistoryEntry};
use crate::manager::HistoryManager;

/// One row of the history timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryView {
    /// Position in the stack, oldest first.
    pub index: usize,
    /// Entry id, stable across eviction of older entries.
    pub id: EntryId,
    /// Timeline label.
    pub label: String,
    /// Iconography tag.
    pub kind: EntryKind,
    /// True if undoing this entry restores the whole document.
    pub structural: bool,
    /// Bytes charged against the history ceiling.
    pub byte_cost: usize,
    /// Commit time.
    pub created_at: DateTime<Local>,
    /// The most recently applied entry (`index == cursor - 1`).
    pub is_current: bool,
    /// Undone and available for redo (`index >= cursor`).
    pub is_future: bool,
}

impl HistoryManager {
    /// All retained entries, oldest first, annotated for timeline rendering.
    pub fn entries(&self) -> Vec<EntryView> {
        let cursor = self.stack().cursor();
        self.stack()
            .iter()
            .enumerate()
            .map(|(index, entry)| EntryView {
                index,
                id: entry.id(),
                label: entry.label().to_string(),
                kind: entry.kind(),
                structural: entry.is_structural(),
                byte_cost: entry.byte_cost(),
                created_at: entry.created_at(),
                is_current: index + 1 == cursor,
                is_future: index >= cursor,
            })
            .collect()
    }

    /// Number of applied entries; `entries()[current_index() - 1]` is current.
    pub fn current_index(&self) -> usize {
        self.stack().cursor()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.stack().len()
    }

    /// True if no entries are retained.
    pub fn is_empty(&self) -> bool {
        self.stack().is_empty()
    }

    /// True if an applied entry exists.
    pub fn can_undo(&self) -> bool {
        self.stack().can_undo()
    }

    /// True if an undone entry exists.
    pub fn can_redo(&self) -> bool {
        self.stack().can_redo()
    }

    /// The entry the next `undo()` would revert, for tooltips.
    pub fn undo_entry(&self) -> Option<&HistoryEntry> {
        let cursor = self.stack().cursor();
        cursor.checked_sub(1).and_then(|i| self.stack().get(i))
    }

    /// The entry the next `redo()` would reapply, for tooltips.
    pub fn redo_entry(&self) -> Option<&HistoryEntry> {
        self.stack().get(self.stack().cursor())
    }

    /// Bytes retained against the configured ceiling.
    pub fn memory_usage(&self) -> MemoryUsage {
        self.stack().usage()
    }
}
