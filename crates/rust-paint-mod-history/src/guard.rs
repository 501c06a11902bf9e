//! Scoped capture that aborts itself unless committed.
use crate::access::LayerAccess;
use crate::entry::EntryId;
use crate::error::HistoryError;
use crate::manager::HistoryManager;
use crate::snapshot::{EffectStackData, LayerId};

/// An open capture bound to a scope.
///
/// Obtained from [`HistoryManager::capture`]. Dropping the guard without
/// calling [`commit`](Self::commit) aborts the capture, so a forgotten or
/// early-returning caller can't leave the manager stuck in `Capturing`.
///
/// ```ignore
/// let mut capture = history.capture("Brush Stroke", EntryKind::Brush, &[layer], &layers)?;
/// paint(&mut layers);
/// capture.commit(&layers);
/// ```
#[must_use = "dropping a capture guard aborts the capture"]
pub struct Capture<'a> {
    history: &'a mut HistoryManager,
    open: bool,
}

impl<'a> Capture<'a> {
    pub(crate) fn new(history: &'a mut HistoryManager) -> Self {
        Self {
            history,
            open: true,
        }
    }

    /// Switches to whole-document snapshot semantics.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::SnapshotFailed`] if the document can't be
    /// copied. The capture is already discarded when this returns.
    pub fn structural<L: LayerAccess + ?Sized>(&mut self, layers: &L) -> Result<&mut Self, HistoryError> {
        let promoted = self.history.begin_structural_change(layers);
        self.close_on_error(promoted)
    }

    /// Marks a layer whose buffer is about to be replaced.
    ///
    /// # Errors
    ///
    /// Same as [`structural`](Self::structural).
    pub fn store_resized_layer<L: LayerAccess + ?Sized>(
        &mut self,
        layer_id: LayerId,
        layers: &L,
    ) -> Result<&mut Self, HistoryError> {
        let stored = self.history.store_resized_layer(layer_id, layers);
        self.close_on_error(stored)
    }

    fn close_on_error(&mut self, result: Result<(), HistoryError>) -> Result<&mut Self, HistoryError> {
        match result {
            Ok(()) => Ok(self),
            Err(e) => {
                self.open = false;
                Err(e)
            }
        }
    }

    /// Adds a layer's pre-edit effect stack to the capture.
    pub fn effects_before(&mut self, layer_id: LayerId, before: EffectStackData) -> &mut Self {
        self.history.capture_effects_before("", layer_id, before);
        self
    }

    /// Commits the capture. See [`HistoryManager::commit_capture`].
    pub fn commit<L: LayerAccess + ?Sized>(mut self, layers: &L) -> Option<EntryId> {
        self.open = false;
        self.history.commit_capture(layers)
    }

    /// Discards the capture explicitly.
    pub fn abort(mut self) {
        self.open = false;
        self.history.abort_capture();
    }
}

impl Drop for Capture<'_> {
    fn drop(&mut self) {
        if self.open {
            tracing::debug!("Capture guard dropped without commit, aborting");
            self.history.abort_capture();
        }
    }
}
