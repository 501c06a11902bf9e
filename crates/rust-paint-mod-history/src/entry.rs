//! History entries and the per-layer deltas they carry.
use std::fmt;
use std::mem::size_of;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use image::RgbaImage;

use crate::access::LayerAccess;
use crate::snapshot::{raster_cost, DocumentSnapshot, EffectStackData, LayerId, LayerRecord, VectorData};

/// Creation-ordered identifier of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw sequence number.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Iconography tag for the timeline. Has no effect on replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryKind {
    Brush,
    Erase,
    Fill,
    Layer,
    Transform,
    Filter,
    Selection,
    Document,
    Effects,
    #[default]
    Other,
}

impl EntryKind {
    /// Name of the icon the timeline shows next to the entry.
    pub fn icon_name(self) -> &'static str {
        match self {
            Self::Brush => "brush",
            Self::Erase => "erase",
            Self::Fill => "fill",
            Self::Layer => "layer",
            Self::Transform => "transform",
            Self::Filter => "filter",
            Self::Selection => "selection",
            Self::Document => "document",
            Self::Effects => "effects",
            Self::Other => "other",
        }
    }
}

/// Which side of an entry is being written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Undo: write `before`.
    Backward,
    /// Redo: write `after`.
    Forward,
}

/// Before/after pair for one layer, in exactly one representation.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffPayload {
    /// Full pixel buffers of a raster layer.
    Raster { before: RgbaImage, after: RgbaImage },
    /// Serialized shape lists of a vector or text layer.
    Vector { before: VectorData, after: VectorData },
    /// Serialized effect stacks; the layer's content is untouched.
    Effects { before: EffectStackData, after: EffectStackData },
}

impl DiffPayload {
    /// True if applying this diff would not change anything.
    pub fn is_unchanged(&self) -> bool {
        match self {
            Self::Raster { before, after } => before == after,
            Self::Vector { before, after } => before == after,
            Self::Effects { before, after } => before == after,
        }
    }

    /// Bytes retained by both sides.
    pub fn byte_cost(&self) -> usize {
        match self {
            Self::Raster { before, after } => raster_cost(before) + raster_cost(after),
            Self::Vector { before, after } => before.byte_cost() + after.byte_cost(),
            Self::Effects { before, after } => before.byte_cost() + after.byte_cost(),
        }
    }
}

/// A reversible change to one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDiff {
    layer_id: LayerId,
    payload: DiffPayload,
}

impl LayerDiff {
    /// Binds a payload to the layer it was captured from.
    pub fn new(layer_id: LayerId, payload: DiffPayload) -> Self {
        Self { layer_id, payload }
    }

    /// Layer the diff writes back to.
    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    /// The before/after pair.
    pub fn payload(&self) -> &DiffPayload {
        &self.payload
    }

    /// Payload bytes plus the diff's own footprint.
    pub fn byte_cost(&self) -> usize {
        size_of::<Self>() + self.payload.byte_cost()
    }

    pub(crate) fn apply<L: LayerAccess + ?Sized>(
        &self,
        layers: &mut L,
        direction: Direction,
    ) -> Result<()> {
        let id = self.layer_id;
        let written = match (&self.payload, direction) {
            (DiffPayload::Raster { before, .. }, Direction::Backward) => layers.write_raster(id, before),
            (DiffPayload::Raster { after, .. }, Direction::Forward) => layers.write_raster(id, after),
            (DiffPayload::Vector { before, .. }, Direction::Backward) => layers.write_vector(id, before),
            (DiffPayload::Vector { after, .. }, Direction::Forward) => layers.write_vector(id, after),
            (DiffPayload::Effects { before, .. }, Direction::Backward) => {
                layers.write_effects(id, before)
            }
            (DiffPayload::Effects { after, .. }, Direction::Forward) => {
                layers.write_effects(id, after)
            }
        };
        written.with_context(|| format!("Failed to restore layer {id}"))
    }
}

/// Whole-document before/after state of a structural edit.
///
/// `before` is the document as it was when the capture began and is the
/// only thing undo writes back. Resized layers are tracked by id; their
/// pre-resize state is their record in `before`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralChange {
    before: DocumentSnapshot,
    after: DocumentSnapshot,
    resized: Vec<LayerId>,
}

impl StructuralChange {
    /// Pairs two snapshots. Ids in `resized` should name layers in `before`.
    pub fn new(before: DocumentSnapshot, after: DocumentSnapshot, resized: Vec<LayerId>) -> Self {
        Self {
            before,
            after,
            resized,
        }
    }

    /// Document state undo restores.
    pub fn before(&self) -> &DocumentSnapshot {
        &self.before
    }

    /// Document state redo restores.
    pub fn after(&self) -> &DocumentSnapshot {
        &self.after
    }

    /// Layers whose buffers the edit replaced, in the order they were reported.
    pub fn resized_layer_ids(&self) -> &[LayerId] {
        &self.resized
    }

    /// Pre-resize records of the resized layers, taken from `before`.
    pub fn resized_layers(&self) -> impl Iterator<Item = &LayerRecord> + '_ {
        self.resized.iter().filter_map(|id| self.before.layer(*id))
    }

    /// Both snapshots plus the resized ids. Resized records are shared with
    /// `before` and not counted twice.
    pub fn byte_cost(&self) -> usize {
        self.before.byte_cost() + self.after.byte_cost() + self.resized.len() * size_of::<LayerId>()
    }

    fn apply<L: LayerAccess + ?Sized>(&self, layers: &mut L, direction: Direction) -> Result<()> {
        match direction {
            Direction::Backward => layers
                .write_document(&self.before)
                .context("Failed to restore document snapshot"),
            Direction::Forward => layers
                .write_document(&self.after)
                .context("Failed to reapply document snapshot"),
        }
    }
}

/// What an entry retains.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EntryPayload {
    Incremental {
        affected: Vec<LayerId>,
        diffs: Vec<LayerDiff>,
    },
    Structural(StructuralChange),
}

impl EntryPayload {
    fn byte_cost(&self) -> usize {
        match self {
            Self::Incremental { affected, diffs } => {
                affected.len() * size_of::<LayerId>()
                    + diffs.iter().map(LayerDiff::byte_cost).sum::<usize>()
            }
            Self::Structural(change) => change.byte_cost(),
        }
    }
}

/// One committed, immutable undo step.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    id: EntryId,
    label: String,
    kind: EntryKind,
    created_at: DateTime<Local>,
    payload: EntryPayload,
    byte_cost: usize,
}

impl HistoryEntry {
    pub(crate) fn new(id: EntryId, label: String, kind: EntryKind, payload: EntryPayload) -> Self {
        let byte_cost = size_of::<Self>() + label.len() + payload.byte_cost();
        Self {
            id,
            label,
            kind,
            created_at: Local::now(),
            payload,
            byte_cost,
        }
    }

    /// Creation-ordered id, unique within this history.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Human-readable description shown in the timeline.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Iconography tag.
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Local time the entry was committed.
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// True if the entry restores the whole document rather than single layers.
    pub fn is_structural(&self) -> bool {
        matches!(self.payload, EntryPayload::Structural(_))
    }

    /// Layers declared by the capturing caller. Empty for structural entries.
    pub fn affected_layer_ids(&self) -> &[LayerId] {
        match &self.payload {
            EntryPayload::Incremental { affected, .. } => affected,
            EntryPayload::Structural(_) => &[],
        }
    }

    /// Per-layer deltas, in capture order. Empty for structural entries.
    pub fn diffs(&self) -> &[LayerDiff] {
        match &self.payload {
            EntryPayload::Incremental { diffs, .. } => diffs,
            EntryPayload::Structural(_) => &[],
        }
    }

    /// Both document snapshots, for structural entries only.
    pub fn structural_change(&self) -> Option<&StructuralChange> {
        match &self.payload {
            EntryPayload::Structural(change) => Some(change),
            EntryPayload::Incremental { .. } => None,
        }
    }

    /// Estimated bytes retained by this entry.
    pub fn byte_cost(&self) -> usize {
        self.byte_cost
    }

    /// Writes one side of the entry back onto the layers.
    ///
    /// Failures are logged per diff and the remaining diffs still apply, so
    /// one vanished layer doesn't strand the others. Returns the number of
    /// failed writes.
    pub(crate) fn apply<L: LayerAccess + ?Sized>(&self, layers: &mut L, direction: Direction) -> usize {
        match &self.payload {
            EntryPayload::Incremental { diffs, .. } => {
                let mut failures = 0;
                let mut apply_one = |diff: &LayerDiff| {
                    if let Err(e) = diff.apply(layers, direction) {
                        tracing::warn!("{} {}: {e:#}", self.label, self.id);
                        failures += 1;
                    }
                };
                match direction {
                    Direction::Backward => diffs.iter().rev().for_each(&mut apply_one),
                    Direction::Forward => diffs.iter().for_each(&mut apply_one),
                }
                failures
            }
            EntryPayload::Structural(change) => match change.apply(layers, direction) {
                Ok(()) => 0,
                Err(e) => {
                    tracing::warn!("{} {}: {e:#}", self.label, self.id);
                    1
                }
            },
        }
    }
}
