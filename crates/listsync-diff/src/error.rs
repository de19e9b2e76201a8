//! Error types for diff application
//!
//! An out-of-range index means the local replica no longer matches the
//! upstream view. These errors are never recovered by clamping.

use crate::diff::DiffKind;

/// A single operation cannot be applied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// Index outside the valid range for the operation kind
    #[error("{kind} index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds {
        kind: DiffKind,
        index: usize,
        len: usize,
    },
}

/// A batch could not be reconciled
///
/// The snapshot the batch was applied to is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Local replica and upstream disagree
    #[error("desynchronized at operation {position} of batch: {source}")]
    Desynchronized {
        /// Position of the failing operation within its batch
        position: usize,
        /// The operation failure
        source: DiffError,
    },
}

impl ReconcileError {
    /// Position of the failing operation within its batch
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Desynchronized { position, .. } => *position,
        }
    }

    /// Underlying operation failure
    #[inline]
    #[must_use]
    pub fn diff_error(&self) -> &DiffError {
        match self {
            Self::Desynchronized { source, .. } => source,
        }
    }
}
