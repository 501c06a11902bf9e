//! Undo/redo history for layered image documents.
//!
//! Provides a `HistoryManager` that records edits through a begin/commit
//! capture protocol, stores the before/after state of every touched layer
//! (or of the whole document for structural edits), and replays them on
//! undo, redo and history jumps. Retained state is byte-accounted and the
//! oldest entries are evicted once the configured ceiling is exceeded.
//!
//! The engine never owns layer data. It reads and writes through the
//! [`LayerAccess`] trait, which the document model implements.
pub mod access;
pub mod budget;
pub mod capture;
pub mod config;
pub mod entry;
pub mod error;
pub mod guard;
pub mod manager;
pub mod query;
pub mod snapshot;
pub mod stack;

pub use access::LayerAccess;
pub use budget::{MemoryBudget, MemoryUsage};
pub use config::HistoryConfig;
pub use entry::{DiffPayload, EntryId, EntryKind, HistoryEntry, LayerDiff, StructuralChange};
pub use error::HistoryError;
pub use guard::Capture;
pub use manager::HistoryManager;
pub use query::EntryView;
pub use snapshot::{
    ContentKind, DocumentSnapshot, EffectStackData, LayerContent, LayerId, LayerRecord, VectorData,
};
pub use stack::HistoryStack;
