//! Projections from source entities to cache entries

use std::hash::Hash;

/// Derives lookup entries from one source entity
///
/// A projection may emit zero, one or several `(key, value)` pairs per
/// entity; a room can register both its id and its alias for the same
/// display name.
pub trait Projection<E>: Send + Sync {
    /// Lookup key
    type Key: Eq + Hash + Clone + Send + Sync;

    /// Cached value
    ///
    /// Ordered so that colliding entries from entities with equal order
    /// keys resolve the same way every time.
    type Value: Clone + Ord + Send + Sync;

    /// Stable ordering key
    ///
    /// When several entities emit the same lookup key, the one with the
    /// greatest order key wins, however the input is ordered.
    fn order_key(&self, entity: &E) -> String;

    /// Push the entries contributed by `entity`
    fn project(&self, entity: &E, out: &mut Vec<(Self::Key, Self::Value)>);
}

/// Projection built from two closures
///
/// Handy for one-off caches and tests.
pub struct FnProjection<O, F> {
    order: O,
    project: F,
}

impl<O, F> FnProjection<O, F> {
    /// Combine an ordering closure with an entry closure
    #[inline]
    #[must_use]
    pub fn new(order: O, project: F) -> Self {
        Self { order, project }
    }
}

impl<E, K, V, O, F> Projection<E> for FnProjection<O, F>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Ord + Send + Sync,
    O: Fn(&E) -> String + Send + Sync,
    F: Fn(&E) -> Vec<(K, V)> + Send + Sync,
{
    type Key = K;
    type Value = V;

    fn order_key(&self, entity: &E) -> String {
        (self.order)(entity)
    }

    fn project(&self, entity: &E, out: &mut Vec<(K, V)>) {
        out.extend((self.project)(entity));
    }
}
