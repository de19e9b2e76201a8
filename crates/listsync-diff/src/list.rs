//! Immutable snapshots of a reconciled list
//!
//! A [`MaterializedList`] is never mutated once published. Successive
//! snapshots share structure through [`im::Vector`], so handing one to
//! every reader is a cheap clone.

use im::Vector;
use std::fmt;

/// Ordered, immutable snapshot of materialized items
///
/// Duplicate keys are tolerated; the list keeps exactly what the diff
/// stream described. Equality compares items only, not the version.
#[derive(Clone)]
pub struct MaterializedList<M: Clone> {
    items: Vector<M>,
    version: u64,
}

impl<M: Clone> MaterializedList<M> {
    /// Create empty snapshot (version 0)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vector::new(),
            version: 0,
        }
    }

    /// Snapshot holding `items` at a given version
    #[inline]
    #[must_use]
    pub fn from_parts(items: Vector<M>, version: u64) -> Self {
        Self { items, version }
    }

    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the snapshot has no items
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&M> {
        self.items.get(index)
    }

    /// First item
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&M> {
        self.items.front()
    }

    /// Last item
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&M> {
        self.items.back()
    }

    /// Iterate in list order
    #[inline]
    pub fn iter(&self) -> im::vector::Iter<'_, M> {
        self.items.iter()
    }

    /// Index of the first item matching `predicate`
    #[must_use]
    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&M) -> bool,
    {
        self.items.iter().position(predicate)
    }

    /// Number of batches applied since the scope started
    ///
    /// Increases by one for every published snapshot.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Underlying persistent vector
    #[inline]
    #[must_use]
    pub fn items(&self) -> &Vector<M> {
        &self.items
    }

    /// Copy items into a `Vec`
    #[must_use]
    pub fn to_vec(&self) -> Vec<M> {
        self.items.iter().cloned().collect()
    }
}

impl<M: Clone> Default for MaterializedList<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Clone + PartialEq> PartialEq for MaterializedList<M> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<M: Clone + Eq> Eq for MaterializedList<M> {}

impl<M: Clone + fmt::Debug> fmt::Debug for MaterializedList<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedList")
            .field("version", &self.version)
            .field("items", &self.items)
            .finish()
    }
}

impl<M: Clone> FromIterator<M> for MaterializedList<M> {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
            version: 0,
        }
    }
}

impl<'a, M: Clone> IntoIterator for &'a MaterializedList<M> {
    type Item = &'a M;
    type IntoIter = im::vector::Iter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
