//! Batch reconciliation
//!
//! [`apply_batch`] folds a [`DiffBatch`] over a snapshot and produces the
//! next snapshot. Operations run strictly in order against a running
//! accumulator; the mapper runs once per raw item, when it enters the list.

use crate::diff::{DiffBatch, DiffOperation};
use crate::error::{DiffError, ReconcileError};
use crate::list::MaterializedList;
use im::Vector;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

/// Pure conversion from a raw item to its materialized form
///
/// Any `Fn(T) -> M` closure is a mapper.
pub trait ItemMapper<T>: Send + Sync {
    /// Materialized item type
    type Item: Clone;

    /// Convert one raw item
    fn materialize(&self, raw: T) -> Self::Item;
}

impl<T, M, F> ItemMapper<T> for F
where
    F: Fn(T) -> M + Send + Sync,
    M: Clone,
{
    type Item = M;

    #[inline]
    fn materialize(&self, raw: T) -> M {
        self(raw)
    }
}

/// Apply `batch` to `current`, producing a new snapshot
///
/// `current` is never modified. On success the new snapshot carries
/// `current.version() + 1`.
///
/// # Errors
/// Returns [`ReconcileError::Desynchronized`] for the first operation whose
/// index is outside the valid range at the point it is applied. Nothing is
/// clamped and no partial result escapes.
pub fn apply_batch<T, P>(
    current: &MaterializedList<P::Item>,
    batch: DiffBatch<T>,
    mapper: &P,
) -> Result<MaterializedList<P::Item>, ReconcileError>
where
    P: ItemMapper<T> + ?Sized,
{
    let mut items = current.items().clone();

    for (position, op) in batch.into_iter().enumerate() {
        apply_operation(&mut items, op, mapper)
            .map_err(|source| ReconcileError::Desynchronized { position, source })?;
    }

    Ok(MaterializedList::from_parts(items, current.version() + 1))
}

/// Apply one operation to a working vector
fn apply_operation<T, P>(
    items: &mut Vector<P::Item>,
    op: DiffOperation<T>,
    mapper: &P,
) -> Result<(), DiffError>
where
    P: ItemMapper<T> + ?Sized,
{
    op.check(items.len())?;

    match op {
        DiffOperation::Append { values } => {
            items.extend(values.into_iter().map(|raw| mapper.materialize(raw)));
        }
        DiffOperation::PushBack { value } => items.push_back(mapper.materialize(value)),
        DiffOperation::PushFront { value } => items.push_front(mapper.materialize(value)),
        DiffOperation::Set { index, value } => {
            items.set(index, mapper.materialize(value));
        }
        DiffOperation::Insert { index, value } => {
            items.insert(index, mapper.materialize(value));
        }
        DiffOperation::Remove { index } => {
            items.remove(index);
        }
        DiffOperation::PopBack => {
            items.pop_back();
        }
        DiffOperation::PopFront => {
            items.pop_front();
        }
        DiffOperation::Clear => items.clear(),
        DiffOperation::Truncate { length } => {
            // im panics when asked to grow through truncate
            if length < items.len() {
                items.truncate(length);
            }
        }
        DiffOperation::Reset { values } => {
            *items = values
                .into_iter()
                .map(|raw| mapper.materialize(raw))
                .collect();
        }
    }

    Ok(())
}

/// Build a batch of `Set` operations refreshing known items in place
///
/// Each update whose key matches an item of `current` becomes a `Set` at
/// the first matching index. Updates for keys absent from the snapshot
/// are dropped.
pub fn refresh_batch<T, M, K, RK, MK>(
    current: &MaterializedList<M>,
    updates: impl IntoIterator<Item = T>,
    raw_key: RK,
    item_key: MK,
) -> DiffBatch<T>
where
    M: Clone,
    K: Eq + Hash,
    RK: Fn(&T) -> K,
    MK: Fn(&M) -> Option<K>,
{
    let mut positions: HashMap<K, usize> = HashMap::with_capacity(current.len());
    for (index, item) in current.iter().enumerate() {
        if let Some(key) = item_key(item) {
            positions.entry(key).or_insert(index);
        }
    }

    updates
        .into_iter()
        .filter_map(|raw| {
            let index = *positions.get(&raw_key(&raw))?;
            Some(DiffOperation::Set { index, value: raw })
        })
        .collect()
}

/// Stateful reconciler owning the current snapshot and mapper
///
/// Not thread-safe by itself: one scope drives one reconciler from a
/// single writer.
///
/// # Type Parameters
/// - `T`: Raw item type carried by the diff stream
/// - `P`: Mapper from `T` to the materialized item
pub struct ListReconciler<T, P: ItemMapper<T>> {
    mapper: P,
    current: MaterializedList<P::Item>,
    _raw: PhantomData<fn(T)>,
}

impl<T, P: ItemMapper<T>> ListReconciler<T, P> {
    /// Create reconciler starting from the empty list
    #[inline]
    #[must_use]
    pub fn new(mapper: P) -> Self {
        Self {
            mapper,
            current: MaterializedList::new(),
            _raw: PhantomData,
        }
    }

    /// Current snapshot
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> &MaterializedList<P::Item> {
        &self.current
    }

    /// Mapper used for incoming items
    #[inline]
    #[must_use]
    pub fn mapper(&self) -> &P {
        &self.mapper
    }

    /// Apply a batch and keep the result as the current snapshot
    ///
    /// # Errors
    /// On [`ReconcileError`] the current snapshot is left as it was.
    pub fn apply(
        &mut self,
        batch: DiffBatch<T>,
    ) -> Result<&MaterializedList<P::Item>, ReconcileError> {
        let next = apply_batch(&self.current, batch, &self.mapper)?;
        self.current = next;
        Ok(&self.current)
    }

    /// Drop all content, keeping the version sequence monotonic
    ///
    /// Returns the new (empty) snapshot.
    pub fn discard(&mut self) -> &MaterializedList<P::Item> {
        self.current = MaterializedList::from_parts(Vector::new(), self.current.version() + 1);
        &self.current
    }
}

impl<T, P> std::fmt::Debug for ListReconciler<T, P>
where
    P: ItemMapper<T>,
    P::Item: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListReconciler")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffKind;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn list(items: &[&'static str]) -> MaterializedList<&'static str> {
        items.iter().copied().collect()
    }

    fn apply(
        items: &[&'static str],
        ops: Vec<DiffOperation<&'static str>>,
    ) -> Vec<&'static str> {
        apply_batch(&list(items), ops.into(), &|raw: &'static str| raw)
            .unwrap()
            .to_vec()
    }

    #[test]
    fn append_adds_after_last() {
        let values = vec!["x", "y", "z"];
        assert_eq!(
            apply(&["a"], vec![DiffOperation::Append { values }]),
            vec!["a", "x", "y", "z"]
        );
    }

    #[test]
    fn push_front_inserts_before_first() {
        assert_eq!(
            apply(&["a"], vec![DiffOperation::PushFront { value: "x" }]),
            vec!["x", "a"]
        );
    }

    #[test]
    fn push_back_appends_one() {
        assert_eq!(
            apply(&["a"], vec![DiffOperation::PushBack { value: "x" }]),
            vec!["a", "x"]
        );
    }

    #[test]
    fn set_replaces_in_place() {
        assert_eq!(
            apply(&["a", "b"], vec![DiffOperation::Set { index: 0, value: "x" }]),
            vec!["x", "b"]
        );
    }

    #[test]
    fn insert_shifts_later_elements() {
        assert_eq!(
            apply(&["a", "b"], vec![DiffOperation::Insert { index: 0, value: "x" }]),
            vec!["x", "a", "b"]
        );
        assert_eq!(
            apply(&["a", "b"], vec![DiffOperation::Insert { index: 2, value: "x" }]),
            vec!["a", "b", "x"]
        );
    }

    #[test]
    fn remove_shifts_earlier() {
        assert_eq!(
            apply(&["a", "b"], vec![DiffOperation::Remove { index: 0 }]),
            vec!["b"]
        );
    }

    #[test]
    fn pop_back_and_front() {
        assert_eq!(apply(&["a", "b"], vec![DiffOperation::PopBack]), vec!["a"]);
        assert_eq!(apply(&["a", "b"], vec![DiffOperation::PopFront]), vec!["b"]);
        assert!(apply(&[], vec![DiffOperation::PopBack]).is_empty());
        assert!(apply(&[], vec![DiffOperation::PopFront]).is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        assert!(apply(&["a", "b"], vec![DiffOperation::Clear]).is_empty());
    }

    #[test]
    fn truncate_keeps_prefix_or_is_noop() {
        assert_eq!(
            apply(&["a", "b"], vec![DiffOperation::Truncate { length: 1 }]),
            vec!["a"]
        );
        assert_eq!(
            apply(&["a", "b"], vec![DiffOperation::Truncate { length: 5 }]),
            vec!["a", "b"]
        );
    }

    #[test]
    fn reset_discards_prior_content() {
        assert_eq!(
            apply(&["a", "b"], vec![DiffOperation::Reset { values: vec!["x"] }]),
            vec!["x"]
        );
    }

    #[test]
    fn batch_is_a_running_accumulator() {
        // Insert at 2 is only valid after the push grew the list.
        let ops = vec![
            DiffOperation::PushBack { value: "b" },
            DiffOperation::Insert { index: 2, value: "c" },
            DiffOperation::Remove { index: 0 },
        ];
        assert_eq!(apply(&["a"], ops), vec!["b", "c"]);
    }

    #[test]
    fn out_of_range_fails_without_touching_snapshot() {
        let current = list(&["a", "b"]);
        let batch: DiffBatch<&str> = vec![
            DiffOperation::PushBack { value: "c" },
            DiffOperation::Set { index: 3, value: "x" },
        ]
        .into();

        let err = apply_batch(&current, batch, &|raw: &'static str| raw).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::Desynchronized {
                position: 1,
                source: DiffError::IndexOutOfBounds {
                    kind: DiffKind::Set,
                    index: 3,
                    len: 3,
                },
            }
        );
        assert_eq!(current.to_vec(), vec!["a", "b"]);
    }

    #[test]
    fn mapper_runs_once_per_entering_item() {
        let calls = AtomicUsize::new(0);
        let mapper = |raw: u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            raw * 10
        };

        let mut reconciler = ListReconciler::new(mapper);
        reconciler
            .apply(
                vec![
                    DiffOperation::Append { values: vec![1, 2] },
                    DiffOperation::Set { index: 0, value: 3 },
                    DiffOperation::Remove { index: 1 },
                    DiffOperation::PushFront { value: 4 },
                ]
                .into(),
            )
            .unwrap();

        assert_eq!(reconciler.snapshot().to_vec(), vec![40, 30]);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn versions_increase_per_batch() {
        let mut reconciler = ListReconciler::new(|raw: u8| raw);
        assert_eq!(reconciler.snapshot().version(), 0);

        reconciler
            .apply(vec![DiffOperation::PushBack { value: 1 }].into())
            .unwrap();
        reconciler
            .apply(
                vec![
                    DiffOperation::PushBack { value: 2 },
                    DiffOperation::PushBack { value: 3 },
                ]
                .into(),
            )
            .unwrap();
        assert_eq!(reconciler.snapshot().version(), 2);

        assert!(reconciler.discard().is_empty());
        assert_eq!(reconciler.snapshot().version(), 3);
    }

    #[test]
    fn failed_apply_keeps_current_snapshot() {
        let mut reconciler = ListReconciler::new(|raw: u8| raw);
        reconciler
            .apply(vec![DiffOperation::PushBack { value: 1 }].into())
            .unwrap();

        let result = reconciler.apply(vec![DiffOperation::Remove { index: 5 }].into());
        assert!(result.is_err());
        assert_eq!(reconciler.snapshot().to_vec(), vec![1]);
        assert_eq!(reconciler.snapshot().version(), 1);
    }

    #[test]
    fn refresh_batch_targets_first_known_index() {
        let current: MaterializedList<(u8, &'static str)> =
            [(1, "old"), (2, "two"), (1, "dup")].into_iter().collect();

        let batch = refresh_batch(
            &current,
            vec![(1, "new"), (9, "unknown")],
            |raw: &(u8, &'static str)| raw.0,
            |item: &(u8, &'static str)| Some(item.0),
        );

        assert_eq!(
            batch.into_operations(),
            vec![DiffOperation::Set {
                index: 0,
                value: (1, "new"),
            }]
        );
    }
}
