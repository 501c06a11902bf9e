//! Memory accounting for retained history.
//!
//! # Invariants
//!
//! 1. `used_bytes` always equals the sum of `byte_cost()` over retained entries
//! 2. after `enforce`, `used_bytes <= max_bytes` or no entries remain
//! 3. eviction only ever removes the oldest entry (index 0)
use std::collections::VecDeque;

use crate::entry::HistoryEntry;

/// Snapshot of memory usage for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    /// Bytes held by retained entries.
    pub used_bytes: usize,
    /// Configured ceiling.
    pub max_bytes: usize,
    /// `100 * used / max`, clamped to `[0, 100]`.
    pub percentage: f64,
}

/// Tracks the byte cost of retained entries against a ceiling.
#[derive(Debug, Clone)]
pub struct MemoryBudget {
    used_bytes: usize,
    max_bytes: usize,
}

impl MemoryBudget {
    /// Empty budget with the given ceiling.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            used_bytes: 0,
            max_bytes,
        }
    }

    /// Bytes currently charged.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// The ceiling.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub(crate) fn set_max_bytes(&mut self, max_bytes: usize) {
        self.max_bytes = max_bytes;
    }

    /// True once usage exceeds the ceiling. Reaching it exactly is fine.
    pub fn is_over(&self) -> bool {
        self.used_bytes > self.max_bytes
    }

    pub(crate) fn charge(&mut self, bytes: usize) {
        self.used_bytes = self.used_bytes.saturating_add(bytes);
    }

    pub(crate) fn release(&mut self, bytes: usize) {
        self.used_bytes = self.used_bytes.saturating_sub(bytes);
    }

    pub(crate) fn reset(&mut self) {
        self.used_bytes = 0;
    }

    /// Evicts entries from the oldest end until back under the ceiling.
    ///
    /// The cursor is decremented once per evicted entry (floored at 0) so it
    /// keeps pointing at the same logical position. Undo steps lost this way
    /// are gone for good. Returns the number of evicted entries.
    pub fn enforce(&mut self, entries: &mut VecDeque<HistoryEntry>, cursor: &mut usize) -> usize {
        let mut evicted = 0;
        while self.is_over() {
            let Some(oldest) = entries.pop_front() else {
                break;
            };
            self.release(oldest.byte_cost());
            *cursor = cursor.saturating_sub(1);
            evicted += 1;
            tracing::debug!(
                "Evicted history entry {} ({}, {} bytes)",
                oldest.id(),
                oldest.label(),
                oldest.byte_cost()
            );
        }
        if evicted > 0 {
            tracing::info!(
                "History over budget: evicted {evicted} oldest entries, {} of {} bytes in use",
                self.used_bytes,
                self.max_bytes
            );
        }
        evicted
    }

    /// Usage for display. A zero ceiling reports 100% once anything is retained.
    pub fn usage(&self) -> MemoryUsage {
        let percentage = if self.max_bytes == 0 {
            if self.used_bytes == 0 {
                0.0
            } else {
                100.0
            }
        } else {
            (100.0 * self.used_bytes as f64 / self.max_bytes as f64).min(100.0)
        };
        MemoryUsage {
            used_bytes: self.used_bytes,
            max_bytes: self.max_bytes,
            percentage,
        }
    }
}
