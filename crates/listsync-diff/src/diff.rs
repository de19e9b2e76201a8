//! Diff operations over a remote ordered collection
//!
//! Provides [`DiffOperation`] for index-addressed mutations and [`DiffBatch`]
//! for groups of operations that must become visible together.

use crate::error::DiffError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One mutation to an ordered collection
///
/// Indices are 0-based and evaluated against the collection as it stands
/// when the operation is applied, after every earlier operation of the
/// same batch.
///
/// # Type Parameters
/// - `T`: The raw (wire) item representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DiffOperation<T> {
    /// Append all values, in order, after the last element
    Append { values: Vec<T> },

    /// Append one value after the last element
    PushBack { value: T },

    /// Insert one value before the first element
    PushFront { value: T },

    /// Replace the element at `index` in place
    ///
    /// Fails if `index >= len`.
    Set { index: usize, value: T },

    /// Insert at `index`, shifting later elements
    ///
    /// Fails if `index > len`.
    Insert { index: usize, value: T },

    /// Remove the element at `index`, shifting later elements
    ///
    /// Fails if `index >= len`.
    Remove { index: usize },

    /// Remove the last element, if any
    PopBack,

    /// Remove the first element, if any
    PopFront,

    /// Remove every element
    Clear,

    /// Keep only the first `length` elements
    Truncate { length: usize },

    /// Replace the whole collection with `values`
    Reset { values: Vec<T> },
}

impl<T> DiffOperation<T> {
    /// Operation kind without payload
    #[inline]
    #[must_use]
    pub fn kind(&self) -> DiffKind {
        match self {
            Self::Append { .. } => DiffKind::Append,
            Self::PushBack { .. } => DiffKind::PushBack,
            Self::PushFront { .. } => DiffKind::PushFront,
            Self::Set { .. } => DiffKind::Set,
            Self::Insert { .. } => DiffKind::Insert,
            Self::Remove { .. } => DiffKind::Remove,
            Self::PopBack => DiffKind::PopBack,
            Self::PopFront => DiffKind::PopFront,
            Self::Clear => DiffKind::Clear,
            Self::Truncate { .. } => DiffKind::Truncate,
            Self::Reset { .. } => DiffKind::Reset,
        }
    }

    /// Check the operation against a collection of length `len`
    ///
    /// # Errors
    /// Returns [`DiffError::IndexOutOfBounds`] if the index is outside the
    /// valid range for this kind of operation.
    pub fn check(&self, len: usize) -> Result<(), DiffError> {
        let (index, valid) = match self {
            Self::Set { index, .. } | Self::Remove { index } => (*index, *index < len),
            Self::Insert { index, .. } => (*index, *index <= len),
            _ => return Ok(()),
        };

        if valid {
            Ok(())
        } else {
            Err(DiffError::IndexOutOfBounds {
                kind: self.kind(),
                index,
                len,
            })
        }
    }

    /// Length of a collection of length `len` after this operation
    ///
    /// Assumes [`check`](Self::check) succeeded for `len`.
    #[must_use]
    pub fn resulting_len(&self, len: usize) -> usize {
        match self {
            Self::Append { values } => len + values.len(),
            Self::PushBack { .. } | Self::PushFront { .. } | Self::Insert { .. } => len + 1,
            Self::Set { .. } => len,
            Self::Remove { .. } | Self::PopBack | Self::PopFront => len.saturating_sub(1),
            Self::Clear => 0,
            Self::Truncate { length } => len.min(*length),
            Self::Reset { values } => values.len(),
        }
    }

    /// Whether the operation discards all prior content
    ///
    /// A batch starting with one of these can rebuild a desynchronized list.
    #[inline]
    #[must_use]
    pub fn is_full_replacement(&self) -> bool {
        matches!(self, Self::Reset { .. } | Self::Clear)
    }

    /// Map the raw payload to another representation
    #[must_use]
    pub fn map<U, F>(self, mut f: F) -> DiffOperation<U>
    where
        F: FnMut(T) -> U,
    {
        match self {
            Self::Append { values } => DiffOperation::Append {
                values: values.into_iter().map(&mut f).collect(),
            },
            Self::PushBack { value } => DiffOperation::PushBack { value: f(value) },
            Self::PushFront { value } => DiffOperation::PushFront { value: f(value) },
            Self::Set { index, value } => DiffOperation::Set {
                index,
                value: f(value),
            },
            Self::Insert { index, value } => DiffOperation::Insert {
                index,
                value: f(value),
            },
            Self::Remove { index } => DiffOperation::Remove { index },
            Self::PopBack => DiffOperation::PopBack,
            Self::PopFront => DiffOperation::PopFront,
            Self::Clear => DiffOperation::Clear,
            Self::Truncate { length } => DiffOperation::Truncate { length },
            Self::Reset { values } => DiffOperation::Reset {
                values: values.into_iter().map(f).collect(),
            },
        }
    }
}

/// Payload-free classification of a [`DiffOperation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Append,
    PushBack,
    PushFront,
    Set,
    Insert,
    Remove,
    PopBack,
    PopFront,
    Clear,
    Truncate,
    Reset,
}

impl DiffKind {
    /// Stable snake_case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::PushBack => "push_back",
            Self::PushFront => "push_front",
            Self::Set => "set",
            Self::Insert => "insert",
            Self::Remove => "remove",
            Self::PopBack => "pop_back",
            Self::PopFront => "pop_front",
            Self::Clear => "clear",
            Self::Truncate => "truncate",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered group of operations applied as one unit
///
/// Readers see the collection before or after the whole batch, never
/// in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffBatch<T> {
    ops: Vec<DiffOperation<T>>,
}

impl<T> DiffBatch<T> {
    /// Create batch from operations
    #[inline]
    #[must_use]
    pub fn new(ops: Vec<DiffOperation<T>>) -> Self {
        Self { ops }
    }

    /// Create empty batch
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self { ops: Vec::new() }
    }

    /// Add an operation at the end
    #[inline]
    pub fn push(&mut self, op: DiffOperation<T>) {
        self.ops.push(op);
    }

    /// Builder-style [`push`](Self::push)
    #[inline]
    #[must_use]
    pub fn with(mut self, op: DiffOperation<T>) -> Self {
        self.ops.push(op);
        self
    }

    /// Number of operations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch has no operations
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Borrow the operations
    #[inline]
    #[must_use]
    pub fn operations(&self) -> &[DiffOperation<T>] {
        &self.ops
    }

    /// Iterate over operations
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, DiffOperation<T>> {
        self.ops.iter()
    }

    /// Whether the first operation discards all prior content
    #[inline]
    #[must_use]
    pub fn starts_with_full_replacement(&self) -> bool {
        self.ops
            .first()
            .is_some_and(DiffOperation::is_full_replacement)
    }

    /// Map every raw payload
    #[must_use]
    pub fn map<U, F>(self, mut f: F) -> DiffBatch<U>
    where
        F: FnMut(T) -> U,
    {
        DiffBatch {
            ops: self.ops.into_iter().map(|op| op.map(&mut f)).collect(),
        }
    }

    /// Consume into the operation list
    #[inline]
    #[must_use]
    pub fn into_operations(self) -> Vec<DiffOperation<T>> {
        self.ops
    }
}

impl<T> Default for DiffBatch<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Vec<DiffOperation<T>>> for DiffBatch<T> {
    fn from(ops: Vec<DiffOperation<T>>) -> Self {
        Self::new(ops)
    }
}

impl<T> FromIterator<DiffOperation<T>> for DiffBatch<T> {
    fn from_iter<I: IntoIterator<Item = DiffOperation<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for DiffBatch<T> {
    type Item = DiffOperation<T>;
    type IntoIter = std::vec::IntoIter<DiffOperation<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a DiffBatch<T> {
    type Item = &'a DiffOperation<T>;
    type IntoIter = std::slice::Iter<'a, DiffOperation<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}
