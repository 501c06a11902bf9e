//! Per-document history manager: capture protocol on top of the stack.
//!
//! Callers bracket every edit with a capture. The manager snapshots the
//! declared layers on begin, the caller mutates the live layers, and commit
//! turns the difference into a history entry. Undo, redo and jumps write the
//! retained state back through [`LayerAccess`].
use std::fmt;

use crate::access::LayerAccess;
use crate::capture::{CaptureState, PendingCapture};
use crate::config::HistoryConfig;
use crate::entry::{EntryId, EntryKind, HistoryEntry};
use crate::error::HistoryError;
use crate::guard::Capture;
use crate::snapshot::{EffectStackData, LayerId};
use crate::stack::HistoryStack;

/// Undo/redo history of one document.
///
/// Owned by the document it records; there is no process-wide instance.
/// Not synchronized: drive it from one thread.
pub struct HistoryManager {
    stack: HistoryStack,
    capture: CaptureState,
    config: HistoryConfig,
}

impl fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryManager")
            .field("len", &self.stack.len())
            .field("cursor", &self.stack.cursor())
            .field("used_bytes", &self.stack.used_bytes())
            .field("max_bytes", &self.config.max_bytes)
            .field("capturing", &!self.capture.is_idle())
            .finish()
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryManager {
    /// Empty history bounded by `config.max_bytes`.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            stack: HistoryStack::new(config.max_bytes),
            capture: CaptureState::Idle,
            config,
        }
    }

    /// Manager with no practical memory ceiling.
    ///
    /// Convenience constructor for tests and simple usage.
    pub fn unlimited() -> Self {
        Self::new(HistoryConfig::unlimited())
    }

    /// Configuration currently in effect, including any later
    /// [`set_max_bytes`](Self::set_max_bytes).
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Read access to the underlying stack.
    pub fn stack(&self) -> &HistoryStack {
        &self.stack
    }

    // ── Capture protocol ──────────────────────────────────────────────

    /// Opens a capture and snapshots the content of `affected` layers.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::CaptureInProgress`] if a capture is already
    /// open. The open capture is left untouched.
    pub fn begin_capture<L: LayerAccess + ?Sized>(
        &mut self,
        label: impl Into<String>,
        kind: EntryKind,
        affected: &[LayerId],
        layers: &L,
    ) -> Result<(), HistoryError> {
        let label = label.into();
        self.ensure_idle(&label)?;
        self.capture = CaptureState::Capturing(PendingCapture::begin(label, kind, affected, layers));
        Ok(())
    }

    /// Switches the open capture to whole-document snapshot semantics.
    ///
    /// Call right after [`begin_capture`](Self::begin_capture), before
    /// mutating anything. No-op without an open capture.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::SnapshotFailed`] if the document can't be
    /// copied. The open capture is discarded.
    pub fn begin_structural_change<L: LayerAccess + ?Sized>(&mut self, layers: &L) -> Result<(), HistoryError> {
        match self.capture.pending_mut() {
            Some(pending) => {
                let promoted = pending.make_structural(layers);
                self.discard_on_error(promoted)
            }
            None => {
                tracing::debug!("begin_structural_change without an open capture");
                Ok(())
            }
        }
    }

    /// Records a layer's effect stack before an effects-only edit.
    ///
    /// Without an open capture this starts one, labelled `label`. With a
    /// non-structural capture open, the effect diff joins it and `label` is
    /// ignored. The `after` side is read at commit. Returns false if the
    /// effects were not recorded (already captured, or covered by a
    /// structural snapshot).
    pub fn capture_effects_before(
        &mut self,
        label: impl Into<String>,
        layer_id: LayerId,
        before: EffectStackData,
    ) -> bool {
        if let Some(pending) = self.capture.pending_mut() {
            return pending.add_effects_before(layer_id, before);
        }
        self.capture =
            CaptureState::Capturing(PendingCapture::effects_only(label.into(), layer_id, before));
        true
    }

    /// Marks a layer whose buffer is about to be replaced. Promotes the
    /// capture to structural if it isn't already; the document snapshot
    /// then holds the layer's pre-resize state.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::SnapshotFailed`] if promotion can't copy the
    /// document. The open capture is discarded.
    pub fn store_resized_layer<L: LayerAccess + ?Sized>(
        &mut self,
        layer_id: LayerId,
        layers: &L,
    ) -> Result<(), HistoryError> {
        match self.capture.pending_mut() {
            Some(pending) => {
                let stored = pending.store_resized_layer(layer_id, layers);
                self.discard_on_error(stored)
            }
            None => {
                tracing::debug!("store_resized_layer without an open capture");
                Ok(())
            }
        }
    }

    /// Closes the open capture and commits its entry.
    ///
    /// Returns `None` when there was no open capture, when nothing changed,
    /// or when a structural capture can't read the document back; degenerate
    /// edits never reach the history. An entry larger
    /// than the whole ceiling is evicted at once but its id is still returned,
    /// since the document did change.
    pub fn commit_capture<L: LayerAccess + ?Sized>(&mut self, layers: &L) -> Option<EntryId> {
        let Some(pending) = self.capture.take() else {
            tracing::debug!("commit_capture without an open capture");
            return None;
        };
        let edit = pending.finish(layers)?;
        let id = self.stack.allocate_id();
        self.stack
            .append(HistoryEntry::new(id, edit.label, edit.kind, edit.payload));
        if self.stack.is_empty() {
            tracing::warn!("Entry {id} alone exceeds the history ceiling and was not retained");
        }
        Some(id)
    }

    fn discard_on_error(&mut self, result: anyhow::Result<()>) -> Result<(), HistoryError> {
        let Err(e) = result else {
            return Ok(());
        };
        let label = self
            .capture
            .take()
            .map(|pending| pending.label().to_string())
            .unwrap_or_default();
        tracing::error!("Capture {label:?} discarded: {e:#}");
        Err(HistoryError::SnapshotFailed {
            label,
            reason: format!("{e:#}"),
        })
    }

    /// Closes the open capture, discarding everything it recorded.
    pub fn abort_capture(&mut self) {
        match self.capture.take() {
            Some(pending) => tracing::debug!("Aborted capture {:?}", pending.label()),
            None => tracing::debug!("abort_capture without an open capture"),
        }
    }

    /// Opens a capture wrapped in a guard that aborts it unless committed.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::CaptureInProgress`] if a capture is already open.
    pub fn capture<L: LayerAccess + ?Sized>(
        &mut self,
        label: impl Into<String>,
        kind: EntryKind,
        affected: &[LayerId],
        layers: &L,
    ) -> Result<Capture<'_>, HistoryError> {
        self.begin_capture(label, kind, affected, layers)?;
        Ok(Capture::new(self))
    }

    /// Begins a capture of the active layer.
    ///
    /// Shorthand for [`begin_capture`](Self::begin_capture) with the affected
    /// set inferred from the layer stack.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::CaptureInProgress`] if a capture is already open.
    pub fn save_state<L: LayerAccess + ?Sized>(
        &mut self,
        label: impl Into<String>,
        kind: EntryKind,
        layers: &L,
    ) -> Result<(), HistoryError> {
        let affected: Vec<LayerId> = layers.active_layer().into_iter().collect();
        self.begin_capture(label, kind, &affected, layers)
    }

    /// Commits the capture opened by [`save_state`](Self::save_state).
    pub fn finish_state<L: LayerAccess + ?Sized>(&mut self, layers: &L) -> Option<EntryId> {
        self.commit_capture(layers)
    }

    /// True while a capture is open.
    pub fn is_capturing(&self) -> bool {
        !self.capture.is_idle()
    }

    fn ensure_idle(&self, requested: &str) -> Result<(), HistoryError> {
        match self.capture.pending() {
            Some(open) => {
                tracing::warn!("Nested capture {requested:?} while {:?} is open", open.label());
                Err(HistoryError::CaptureInProgress {
                    open: open.label().to_string(),
                    requested: requested.to_string(),
                })
            }
            None => Ok(()),
        }
    }

    // ── Navigation ────────────────────────────────────────────────────

    /// Undoes the most recent applied entry.
    ///
    /// Returns false at the bottom of the stack or while a capture is open.
    pub fn undo<L: LayerAccess + ?Sized>(&mut self, layers: &mut L) -> bool {
        if self.refuse_while_capturing("undo") {
            return false;
        }
        self.stack.undo(layers)
    }

    /// Redoes the most recently undone entry.
    ///
    /// Returns false at the top of the stack or while a capture is open.
    pub fn redo<L: LayerAccess + ?Sized>(&mut self, layers: &mut L) -> bool {
        if self.refuse_while_capturing("redo") {
            return false;
        }
        self.stack.redo(layers)
    }

    /// Moves to an arbitrary point in history by stepping one entry at a time.
    ///
    /// `target` is the cursor position to reach: `0` undoes everything,
    /// `len()` redoes everything. Out-of-range targets are clamped. Returns
    /// the number of steps taken.
    pub fn jump_to_history<L: LayerAccess + ?Sized>(&mut self, target: usize, layers: &mut L) -> usize {
        if self.refuse_while_capturing("jump") {
            return 0;
        }
        self.stack.jump_to(target, layers)
    }

    /// Drops all history. Any open capture is discarded too.
    ///
    /// Called when a new document is created or an existing one reloaded.
    pub fn clear(&mut self) {
        if self.is_capturing() {
            self.abort_capture();
        }
        self.stack.clear();
    }

    /// Changes the memory ceiling, evicting immediately if now over it.
    /// Returns the number of evicted entries.
    pub fn set_max_bytes(&mut self, max_bytes: usize) -> usize {
        self.config.max_bytes = max_bytes;
        self.stack.set_max_bytes(max_bytes)
    }

    fn refuse_while_capturing(&self, action: &str) -> bool {
        match self.capture.pending() {
            Some(open) => {
                tracing::warn!("Ignoring {action} while capture {:?} is open", open.label());
                true
            }
            None => false,
        }
    }
}
