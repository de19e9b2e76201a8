//! listsync Diff Engine
//!
//! Applies ordered diff streams describing a remote, server-maintained list
//! to an immutable local replica.
//!
//! # Core Concepts
//!
//! - [`DiffOperation<T>`]: One index-addressed mutation (append, insert, reset, ...)
//! - [`DiffBatch<T>`]: Operations that become visible together
//! - [`MaterializedList<M>`]: Immutable snapshot of mapped items
//! - [`ItemMapper`]: Pure conversion from wire item to materialized item
//! - [`ListReconciler`]: Owns the current snapshot and applies batches
//!
//! # Example
//!
//! ```rust
//! use listsync_diff::{DiffOperation, ListReconciler};
//!
//! let mut reconciler = ListReconciler::new(|raw: &str| raw.to_uppercase());
//! reconciler
//!     .apply(vec![DiffOperation::Append { values: vec!["a", "b"] }].into())
//!     .unwrap();
//!
//! assert_eq!(reconciler.snapshot().to_vec(), vec!["A", "B"]);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod diff;
mod error;
mod list;
mod reconcile;

// Re-exports
pub use diff::{DiffBatch, DiffKind, DiffOperation};
pub use error::{DiffError, ReconcileError};
pub use list::MaterializedList;
pub use reconcile::{apply_batch, refresh_batch, ItemMapper, ListReconciler};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        label: String,
    }

    fn row(raw: (&str, &str)) -> Row {
        Row {
            id: raw.0.to_string(),
            label: raw.1.to_string(),
        }
    }

    #[test]
    fn reconcile_then_refresh() {
        let mut reconciler = ListReconciler::new(row);
        reconciler
            .apply(
                vec![DiffOperation::Reset {
                    values: vec![("!a", "Alpha"), ("!b", "Beta")],
                }]
                .into(),
            )
            .unwrap();

        let refresh = refresh_batch(
            reconciler.snapshot(),
            vec![("!b", "Beta (renamed)")],
            |raw| raw.0.to_string(),
            |item| Some(item.id.clone()),
        );
        assert_eq!(refresh.len(), 1);

        let snapshot = reconciler.apply(refresh).unwrap();
        assert_eq!(snapshot.get(1).map(|r| r.label.as_str()), Some("Beta (renamed)"));
        assert_eq!(snapshot.version(), 2);
    }

    #[test]
    fn desynchronized_batch_reports_position() {
        let mut reconciler = ListReconciler::<(&str, &str), _>::new(row);
        let err = reconciler
            .apply(vec![DiffOperation::Remove { index: 0 }].into())
            .unwrap_err();

        assert_eq!(err.position(), 0);
        assert!(matches!(
            err.diff_error(),
            DiffError::IndexOutOfBounds {
                kind: DiffKind::Remove,
                ..
            }
        ));
    }
}
