//! Capture protocol: snapshot "before" state, then compute the delta at commit.
//!
//! ```text
//!            begin_capture                    commit_capture
//!   Idle ─────────────────────▶ Capturing ─────────────────────▶ Idle (+ entry)
//!                                   │
//!                                   │ abort_capture / guard dropped
//!                                   ▼
//!                                 Idle
//! ```
//!
//! While capturing, the caller mutates the live layers directly. At commit
//! every snapshotted layer is read again; if nothing changed the capture is
//! dropped without producing an entry.
//!
//! A capture promoted to structural keeps one [`DocumentSnapshot`] as its
//! whole "before" side. Content and effects captured ahead of the promotion
//! are folded into that snapshot, so it always reflects the document as it
//! was when the capture began.
use anyhow::Result;
use image::RgbaImage;

use crate::access::LayerAccess;
use crate::entry::{DiffPayload, EntryKind, EntryPayload, LayerDiff, StructuralChange};
use crate::snapshot::{
    ContentKind, DocumentSnapshot, EffectStackData, LayerContent, LayerId, VectorData,
};

/// Capture protocol state.
#[derive(Debug, Default)]
pub enum CaptureState {
    /// No capture open; edits go unrecorded.
    #[default]
    Idle,
    /// A capture is open and its before-state is held here.
    Capturing(PendingCapture),
}

impl CaptureState {
    /// True when no capture is open.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The open capture, if any.
    pub fn pending(&self) -> Option<&PendingCapture> {
        match self {
            Self::Idle => None,
            Self::Capturing(pending) => Some(pending),
        }
    }

    pub(crate) fn pending_mut(&mut self) -> Option<&mut PendingCapture> {
        match self {
            Self::Idle => None,
            Self::Capturing(pending) => Some(pending),
        }
    }

    /// Leaves the `Capturing` state, returning what was captured.
    pub(crate) fn take(&mut self) -> Option<PendingCapture> {
        match std::mem::take(self) {
            Self::Idle => None,
            Self::Capturing(pending) => Some(pending),
        }
    }
}

/// Content of one layer as it was when the capture began.
#[derive(Debug)]
enum ContentBefore {
    Raster(RgbaImage),
    Vector(VectorData),
}

impl From<ContentBefore> for LayerContent {
    fn from(before: ContentBefore) -> Self {
        match before {
            ContentBefore::Raster(pixels) => Self::Raster(pixels),
            ContentBefore::Vector(data) => Self::Vector(data),
        }
    }
}

/// Everything recorded between begin and commit.
#[derive(Debug)]
pub struct PendingCapture {
    /// Timeline label of the entry this capture will produce.
    label: String,
    kind: EntryKind,
    /// Layers declared by the caller, deduplicated, in declaration order.
    affected: Vec<LayerId>,
    /// Pre-edit content of each affected layer. Emptied on promotion.
    content: Vec<(LayerId, ContentBefore)>,
    /// Pre-edit effect stacks. Emptied on promotion.
    effects: Vec<(LayerId, EffectStackData)>,
    /// Whole-document before-state once the capture is structural.
    structural: Option<DocumentSnapshot>,
    /// Layers reported as resized. Their pre-resize state lives in `structural`.
    resized: Vec<LayerId>,
}

/// A finished capture, ready to become an entry.
pub(crate) struct CapturedEdit {
    pub(crate) label: String,
    pub(crate) kind: EntryKind,
    pub(crate) payload: EntryPayload,
}

impl PendingCapture {
    /// Snapshots the content of every affected layer.
    ///
    /// Raster layers copy their pixel buffer, vector layers serialize their
    /// shape list. Unknown ids are skipped.
    pub(crate) fn begin<L: LayerAccess + ?Sized>(
        label: String,
        kind: EntryKind,
        affected: &[LayerId],
        layers: &L,
    ) -> Self {
        let mut pending = Self {
            label,
            kind,
            affected: Vec::with_capacity(affected.len()),
            content: Vec::with_capacity(affected.len()),
            effects: Vec::new(),
            structural: None,
            resized: Vec::new(),
        };
        for &id in affected {
            if pending.affected.contains(&id) {
                continue;
            }
            pending.affected.push(id);
            let before = match layers.content_kind(id) {
                Some(ContentKind::Raster) => layers.read_raster(id).map(ContentBefore::Raster),
                Some(ContentKind::Vector) => layers.read_vector(id).map(ContentBefore::Vector),
                None => None,
            };
            match before {
                Some(before) => pending.content.push((id, before)),
                None => tracing::warn!("{}: layer {id} not found, not captured", pending.label),
            }
        }
        pending
    }

    /// Starts an effect-only capture with no content snapshots.
    pub(crate) fn effects_only(label: String, layer_id: LayerId, before: EffectStackData) -> Self {
        Self {
            label,
            kind: EntryKind::Effects,
            affected: vec![layer_id],
            content: Vec::new(),
            effects: vec![(layer_id, before)],
            structural: None,
            resized: Vec::new(),
        }
    }

    /// Label the committed entry will carry.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Iconography tag the committed entry will carry.
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// True once the capture snapshots the whole document.
    pub fn is_structural(&self) -> bool {
        self.structural.is_some()
    }

    /// Switches to whole-document snapshot semantics.
    ///
    /// Content and effects captured so far replace the live copies in the
    /// new snapshot, then the per-layer state is dropped.
    pub(crate) fn make_structural<L: LayerAccess + ?Sized>(&mut self, layers: &L) -> Result<()> {
        if self.structural.is_some() {
            tracing::debug!("{}: already structural", self.label);
            return Ok(());
        }
        let mut snapshot = layers.read_document()?;
        for (id, before) in self.content.drain(..) {
            match snapshot.layers.iter_mut().find(|r| r.id == id) {
                Some(record) => record.content = before.into(),
                None => tracing::warn!("{}: layer {id} gone before promotion, content lost", self.label),
            }
        }
        for (id, before) in self.effects.drain(..) {
            match snapshot.layers.iter_mut().find(|r| r.id == id) {
                Some(record) => record.effects = before,
                None => tracing::warn!("{}: layer {id} gone before promotion, effects lost", self.label),
            }
        }
        self.structural = Some(snapshot);
        Ok(())
    }

    /// Records a layer's serialized effects as they were before the edit.
    ///
    /// Returns false if the effects are already covered by this capture.
    pub(crate) fn add_effects_before(&mut self, layer_id: LayerId, before: EffectStackData) -> bool {
        if self.structural.is_some() {
            tracing::debug!("{}: effects covered by document snapshot", self.label);
            return false;
        }
        if self.effects.iter().any(|(id, _)| *id == layer_id) {
            tracing::warn!("{}: effects of layer {layer_id} already captured", self.label);
            return false;
        }
        if !self.affected.contains(&layer_id) {
            self.affected.push(layer_id);
        }
        self.effects.push((layer_id, before));
        true
    }

    /// Marks a layer whose buffer is about to be replaced.
    ///
    /// Promotes the capture to structural first if needed. The pre-resize
    /// state is the layer's record in the document snapshot; only the id is
    /// kept here. Layers the snapshot doesn't know are skipped.
    pub(crate) fn store_resized_layer<L: LayerAccess + ?Sized>(
        &mut self,
        layer_id: LayerId,
        layers: &L,
    ) -> Result<()> {
        if self.structural.is_none() {
            tracing::debug!("{}: resize promotes capture to structural", self.label);
            self.make_structural(layers)?;
        }
        let known = self
            .structural
            .as_ref()
            .is_some_and(|snapshot| snapshot.layer(layer_id).is_some());
        if !known {
            tracing::warn!("{}: resized layer {layer_id} not in document snapshot", self.label);
        } else if !self.resized.contains(&layer_id) {
            self.resized.push(layer_id);
        }
        Ok(())
    }

    /// Reads the current state of everything snapshotted and builds the entry
    /// payload. Returns `None` when the edit changed nothing, or when a
    /// structural capture can't read the document back.
    pub(crate) fn finish<L: LayerAccess + ?Sized>(self, layers: &L) -> Option<CapturedEdit> {
        let Self {
            label,
            kind,
            affected,
            content,
            effects,
            structural,
            resized,
        } = self;

        if let Some(before) = structural {
            let after = match layers.read_document() {
                Ok(after) => after,
                Err(e) => {
                    tracing::error!("{label}: cannot read document, edit not recorded: {e:#}");
                    return None;
                }
            };
            if before == after {
                tracing::debug!("{label}: document unchanged, no entry");
                return None;
            }
            return Some(CapturedEdit {
                label,
                kind,
                payload: EntryPayload::Structural(StructuralChange::new(before, after, resized)),
            });
        }

        let mut diffs = Vec::with_capacity(content.len() + effects.len());
        for (id, before) in content {
            let payload = match before {
                ContentBefore::Raster(before) => layers
                    .read_raster(id)
                    .map(|after| DiffPayload::Raster { before, after }),
                ContentBefore::Vector(before) => layers
                    .read_vector(id)
                    .map(|after| DiffPayload::Vector { before, after }),
            };
            match payload {
                Some(payload) if payload.is_unchanged() => {}
                Some(payload) => diffs.push(LayerDiff::new(id, payload)),
                None => tracing::warn!("{label}: layer {id} vanished or changed type, diff dropped"),
            }
        }
        for (id, before) in effects {
            match layers.read_effects(id) {
                Some(after) if after == before => {}
                Some(after) => diffs.push(LayerDiff::new(id, DiffPayload::Effects { before, after })),
                None => tracing::warn!("{label}: layer {id} vanished, effects diff dropped"),
            }
        }

        if diffs.is_empty() {
            tracing::debug!("{label}: nothing changed, no entry");
            return None;
        }
        Some(CapturedEdit {
            label,
            kind,
            payload: EntryPayload::Incremental { affected, diffs },
        })
    }
}
