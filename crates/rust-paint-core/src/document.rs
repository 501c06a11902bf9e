//! Document model combining the layer stack, its history and metadata.
//!
//! Every editing operation on a `Document` brackets its mutation with a
//! history capture, so each one becomes (at most) one undoable entry.
//! [`Document::edit`] and [`Document::edit_structural`] are the generic
//! forms the named operations are built on.

use anyhow::{Context, Result};
use image::Rgba;

use crate::effects::EffectStack;
use crate::history::{EntryId, EntryKind, HistoryConfig, HistoryManager, LayerAccess, LayerId};
use crate::layer_stack::{LayerStack, TRANSPARENT};
use crate::shape::Shape;

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 600;
const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A single image with its layers, history, and metadata.
pub struct Document {
    /// The live layer state.
    pub layers: LayerStack,
    /// Undo/redo history. Owned here; there is one per document.
    pub history: HistoryManager,
    /// Whether the document has changed since it was created or reset.
    pub modified: bool,
    /// Display name for the tab.
    pub title: String,
    /// Monotonically increasing version counter, bumped on every layer mutation.
    /// Used by render caches to detect changes without comparing pixels.
    pub content_version: u64,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("title", &self.title)
            .field("width", &self.layers.width())
            .field("height", &self.layers.height())
            .field("layers", &self.layers.len())
            .field("history", &self.history)
            .field("modified", &self.modified)
            .field("content_version", &self.content_version)
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(
            DEFAULT_WIDTH,
            DEFAULT_HEIGHT,
            DEFAULT_BACKGROUND,
            HistoryConfig::default(),
        )
    }
}

impl Document {
    /// Creates a document with a single background layer.
    pub fn new(width: u32, height: u32, background: Rgba<u8>, config: HistoryConfig) -> Self {
        Self {
            layers: LayerStack::new(width, height, background),
            history: HistoryManager::new(config),
            modified: false,
            title: "Untitled".to_string(),
            content_version: 0,
        }
    }

    /// Bumps the content version counter.
    #[inline]
    fn bump_version(&mut self) {
        self.content_version = self.content_version.wrapping_add(1);
    }

    /// Called after anything changed the layers.
    fn touch(&mut self) {
        self.modified = true;
        self.bump_version();
    }

    /// Replaces the document with a blank canvas and drops all history.
    pub fn reset(&mut self, width: u32, height: u32, background: Rgba<u8>) {
        self.layers = LayerStack::new(width, height, background);
        self.history.clear();
        self.modified = false;
        self.title = "Untitled".to_string();
        self.bump_version();
    }

    // ── Generic edits ─────────────────────────────────────────────────

    /// Runs `f` against the layers inside a capture of `affected`.
    ///
    /// The capture is committed if `f` succeeds and aborted if it fails, so
    /// a failed edit never leaves a partial entry behind. Layers outside
    /// `affected` must not be modified by `f`.
    ///
    /// # Errors
    ///
    /// Returns an error if a capture is already open or if `f` fails.
    pub fn edit<T, F>(&mut self, label: &str, kind: EntryKind, affected: &[LayerId], f: F) -> Result<T>
    where
        F: FnOnce(&mut LayerStack) -> Result<T>,
    {
        let capture = self.history.capture(label, kind, affected, &self.layers)?;
        let value = f(&mut self.layers)?;
        if capture.commit(&self.layers).is_some() {
            self.touch();
        }
        Ok(value)
    }

    /// Like [`edit`](Self::edit), but snapshots the whole document.
    ///
    /// Use for anything that adds, removes or reorders layers, or changes
    /// layer properties other than content and effects.
    ///
    /// # Errors
    ///
    /// Returns an error if a capture is already open or if `f` fails.
    pub fn edit_structural<T, F>(&mut self, label: &str, kind: EntryKind, f: F) -> Result<T>
    where
        F: FnOnce(&mut LayerStack) -> Result<T>,
    {
        let mut capture = self.history.capture(label, kind, &[], &self.layers)?;
        capture.structural(&self.layers)?;
        let value = f(&mut self.layers)?;
        if capture.commit(&self.layers).is_some() {
            self.touch();
        }
        Ok(value)
    }

    // ── Raster editing ────────────────────────────────────────────────

    /// Paints a solid rectangle on a raster layer as one brush entry.
    ///
    /// A zero-area rectangle is a no-op and records nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is missing or not a raster layer.
    pub fn paint_rect(
        &mut self,
        layer: LayerId,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        color: Rgba<u8>,
    ) -> Result<()> {
        self.rect_edit("Brush Stroke", EntryKind::Brush, layer, (x, y, width, height), color)
    }

    /// Clears a rectangle on a raster layer to transparent.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is missing or not a raster layer.
    pub fn erase_rect(&mut self, layer: LayerId, x: u32, y: u32, width: u32, height: u32) -> Result<()> {
        self.rect_edit("Eraser", EntryKind::Erase, layer, (x, y, width, height), TRANSPARENT)
    }

    fn rect_edit(
        &mut self,
        label: &str,
        kind: EntryKind,
        layer: LayerId,
        (x, y, width, height): (u32, u32, u32, u32),
        color: Rgba<u8>,
    ) -> Result<()> {
        let capture = self.history.capture(label, kind, &[layer], &self.layers)?;
        if width == 0 || height == 0 {
            tracing::debug!("{label}: zero-area rectangle, nothing to record");
            capture.abort();
            return Ok(());
        }
        self.layers
            .fill_rect(layer, x, y, width, height, color)
            .with_context(|| format!("{label} on layer {layer} failed"))?;
        if capture.commit(&self.layers).is_some() {
            self.touch();
        }
        Ok(())
    }

    /// Fills a whole raster layer with one colour.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is missing or not a raster layer.
    pub fn fill_layer(&mut self, layer: LayerId, color: Rgba<u8>) -> Result<()> {
        self.edit("Fill", EntryKind::Fill, &[layer], |layers| layers.fill(layer, color))
    }

    // ── Layers ────────────────────────────────────────────────────────

    /// Adds a transparent raster layer on top and makes it active.
    ///
    /// # Errors
    ///
    /// Returns an error if a capture is already open.
    pub fn add_raster_layer(&mut self, name: &str) -> Result<LayerId> {
        self.edit_structural("New Layer", EntryKind::Layer, |layers| {
            Ok(layers.add_raster(name))
        })
    }

    /// Adds an empty vector layer on top and makes it active.
    ///
    /// # Errors
    ///
    /// Returns an error if a capture is already open.
    pub fn add_vector_layer(&mut self, name: &str) -> Result<LayerId> {
        self.edit_structural("New Vector Layer", EntryKind::Layer, |layers| {
            Ok(layers.add_vector(name))
        })
    }

    /// Deletes a layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist.
    pub fn remove_layer(&mut self, layer: LayerId) -> Result<()> {
        self.edit_structural("Delete Layer", EntryKind::Layer, |layers| {
            layers.remove(layer).map(|_| ())
        })
    }

    /// Appends a shape to a vector layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is missing or not a vector layer.
    pub fn add_shape(&mut self, layer: LayerId, shape: Shape) -> Result<()> {
        let label = format!("Add {}", shape.name());
        self.edit(&label, EntryKind::Layer, &[layer], |layers| {
            layers.push_shape(layer, shape)
        })
    }

    /// Sets a layer's opacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist.
    pub fn set_layer_opacity(&mut self, layer: LayerId, opacity: f32) -> Result<()> {
        self.edit_structural("Layer Opacity", EntryKind::Layer, |layers| {
            layers.set_opacity(layer, opacity)
        })
    }

    /// Replaces a layer's effect stack as one effects entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist or a capture is open.
    pub fn set_layer_effects(&mut self, layer: LayerId, effects: EffectStack) -> Result<()> {
        if self.history.is_capturing() {
            anyhow::bail!("Cannot edit effects while another edit is in progress");
        }
        let before = self
            .layers
            .read_effects(layer)
            .with_context(|| format!("No layer with id {layer}"))?;
        self.history
            .capture_effects_before("Layer Effects", layer, before);
        if let Err(err) = self.layers.set_effects(layer, effects) {
            self.history.abort_capture();
            return Err(err);
        }
        if self.history.commit_capture(&self.layers).is_some() {
            self.touch();
        }
        Ok(())
    }

    // ── Canvas ────────────────────────────────────────────────────────

    /// Resizes the canvas, anchored top-left.
    ///
    /// Recorded as a structural entry that also keeps every raster layer's
    /// pre-resize state.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> Result<()> {
        let raster_ids: Vec<LayerId> = self
            .layers
            .layers()
            .iter()
            .filter(|l| l.raster().is_some())
            .map(|l| l.id)
            .collect();
        let mut capture = self
            .history
            .capture("Resize Canvas", EntryKind::Document, &[], &self.layers)?;
        capture.structural(&self.layers)?;
        for id in raster_ids {
            capture.store_resized_layer(id, &self.layers)?;
        }
        self.layers.resize_canvas(width, height)?;
        if capture.commit(&self.layers).is_some() {
            self.touch();
        }
        Ok(())
    }

    /// Makes `layer` the active layer. Not recorded in history.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist.
    pub fn select_layer(&mut self, layer: LayerId) -> Result<()> {
        self.layers.set_active(layer)
    }

    // ── History navigation ────────────────────────────────────────────

    /// Performs undo. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo(&mut self.layers);
        if moved {
            self.touch();
        }
        moved
    }

    /// Performs redo. Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo(&mut self.layers);
        if moved {
            self.touch();
        }
        moved
    }

    /// Moves to history position `target` (see
    /// [`HistoryManager::jump_to_history`]). Returns the steps taken.
    pub fn jump_to_history(&mut self, target: usize) -> usize {
        let steps = self.history.jump_to_history(target, &mut self.layers);
        if steps > 0 {
            self.touch();
        }
        steps
    }

    /// Id of the entry the last successful edit produced, if still retained.
    pub fn last_entry(&self) -> Option<EntryId> {
        self.history.undo_entry().map(|entry| entry.id())
    }
}
