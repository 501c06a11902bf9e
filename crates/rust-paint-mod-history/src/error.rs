//! Errors reported by the capture protocol.
use thiserror::Error;

/// Capture protocol violations that are reported back to the caller.
///
/// Every other misuse (commit or abort without a capture, undo at the bottom
/// of the stack...) is tolerated as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// A capture was started while another one is still open.
    #[error("cannot begin capture {requested:?}: capture {open:?} is still open")]
    CaptureInProgress { open: String, requested: String },

    /// The document could not be snapshotted for a structural capture.
    /// The capture is discarded.
    #[error("cannot snapshot document for {label:?}: {reason}")]
    SnapshotFailed { label: String, reason: String },
}
