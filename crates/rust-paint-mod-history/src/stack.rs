//! Ordered list of committed entries plus the undo/redo cursor.
//!
//! ```text
//!            undoable            redoable
//!   ┌───────────────────────┬─────────────────┐
//!   │ e0   e1   e2   e3     │ e4   e5         │
//!   └───────────────────────┴─────────────────┘
//!                           ▲
//!                         cursor = 4
//! ```
//!
//! Appending while the cursor sits before the end destroys the redo tail;
//! history never forks.
use std::collections::VecDeque;

use crate::access::LayerAccess;
use crate::budget::{MemoryBudget, MemoryUsage};
use crate::entry::{Direction, EntryId, HistoryEntry};

/// Linear undo/redo stack with memory accounting.
#[derive(Debug)]
pub struct HistoryStack {
    entries: VecDeque<HistoryEntry>,
    /// `entries[..cursor]` are applied, `entries[cursor..]` are undone.
    cursor: usize,
    budget: MemoryBudget,
    next_id: u64,
}

impl HistoryStack {
    /// Empty stack bounded by `max_bytes`.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            budget: MemoryBudget::new(max_bytes),
            next_id: 0,
        }
    }

    /// Hands out the next creation-ordered id.
    pub(crate) fn allocate_id(&mut self) -> EntryId {
        let id = EntryId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends a committed entry.
    ///
    /// Drops the redo tail, moves the cursor past the new entry and then
    /// enforces the memory ceiling. Returns the number of evicted entries.
    pub fn append(&mut self, entry: HistoryEntry) -> usize {
        for discarded in self.entries.drain(self.cursor..) {
            self.budget.release(discarded.byte_cost());
        }
        self.budget.charge(entry.byte_cost());
        tracing::debug!(
            "Committed {} {:?} ({} bytes)",
            entry.id(),
            entry.label(),
            entry.byte_cost()
        );
        self.entries.push_back(entry);
        self.cursor = self.entries.len();
        self.budget.enforce(&mut self.entries, &mut self.cursor)
    }

    /// Steps back one entry, writing its `before` state.
    ///
    /// Returns false at the bottom of the stack.
    pub fn undo<L: LayerAccess + ?Sized>(&mut self, layers: &mut L) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let entry = &self.entries[self.cursor];
        tracing::debug!("Undo {} {:?}", entry.id(), entry.label());
        entry.apply(layers, Direction::Backward);
        true
    }

    /// Steps forward one entry, writing its `after` state.
    ///
    /// Returns false at the top of the stack.
    pub fn redo<L: LayerAccess + ?Sized>(&mut self, layers: &mut L) -> bool {
        if self.cursor == self.entries.len() {
            return false;
        }
        let entry = &self.entries[self.cursor];
        tracing::debug!("Redo {} {:?}", entry.id(), entry.label());
        entry.apply(layers, Direction::Forward);
        self.cursor += 1;
        true
    }

    /// Moves the cursor to `target` by repeated single-step undo or redo.
    ///
    /// `target` is clamped to `[0, len]`. Cost is linear in the distance.
    /// Returns the number of steps taken.
    pub fn jump_to<L: LayerAccess + ?Sized>(&mut self, target: usize, layers: &mut L) -> usize {
        let target = target.min(self.entries.len());
        let mut steps = 0;
        while self.cursor > target && self.undo(layers) {
            steps += 1;
        }
        while self.cursor < target && self.redo(layers) {
            steps += 1;
        }
        steps
    }

    /// Drops every entry and resets the cursor and accounting.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.budget.reset();
    }

    /// Changes the ceiling and evicts immediately if now over it.
    pub fn set_max_bytes(&mut self, max_bytes: usize) -> usize {
        self.budget.set_max_bytes(max_bytes);
        self.budget.enforce(&mut self.entries, &mut self.cursor)
    }

    /// Number of applied entries; the next undo targets `cursor - 1`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of retained entries, applied and undone.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, oldest first.
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// True if an applied entry exists.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// True if an undone entry exists.
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Bytes retained against the ceiling.
    pub fn usage(&self) -> MemoryUsage {
        self.budget.usage()
    }

    /// Bytes currently charged.
    pub fn used_bytes(&self) -> usize {
        self.budget.used_bytes()
    }
}
