//! Full-replacement derived cache
//!
//! Provides [`DerivedCache`], a lookup table rebuilt from scratch from
//! the complete set of source entities on every [`DerivedCache::replace`].

use crate::projection::Projection;
use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Predicate deciding whether an entity is indexed at all
pub type EntityFilter<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// Immutable map held by a cache at one point in time
pub type CacheMap<P, E> =
    HashMap<<P as Projection<E>>::Key, <P as Projection<E>>::Value>;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of keys in the current map
    pub entry_count: usize,

    /// Number of `replace` calls that changed the map
    pub change_count: u64,
}

/// Keyed lookup table derived from a list of entities
///
/// Reads clone values out of the current map and never block on a
/// rebuild; the map is built off to the side and swapped in whole.
///
/// The change counter increments once per [`replace`](Self::replace)
/// whose resulting map differs from the previous one. A replace with no
/// effective change leaves it untouched.
pub struct DerivedCache<E, P: Projection<E>> {
    label: &'static str,
    projection: P,
    filter: Option<EntityFilter<E>>,
    map: RwLock<Arc<CacheMap<P, E>>>,
    changes: AtomicU64,
}

impl<E, P: Projection<E>> DerivedCache<E, P> {
    /// Create empty cache
    ///
    /// `label` only identifies the cache in traces.
    #[must_use]
    pub fn new(label: &'static str, projection: P) -> Self {
        Self {
            label,
            projection,
            filter: None,
            map: RwLock::new(Arc::new(HashMap::new())),
            changes: AtomicU64::new(0),
        }
    }

    /// Only index entities accepted by `filter`
    ///
    /// Rejected entities contribute no entries, even if an earlier
    /// replace indexed them.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Label used in traces
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Rebuild the map from the complete set of source entities
    ///
    /// Returns `true` if the map changed.
    pub fn replace<'a, I>(&self, entities: I) -> bool
    where
        I: IntoIterator<Item = &'a E>,
        E: 'a,
    {
        let next = self.build(entities);

        // Single writer: nothing else swaps the map between this read and
        // the write below, so only the assignment happens under the lock.
        let current = self.snapshot();
        if *current == next {
            debug!(cache = self.label, entries = next.len(), "cache unchanged");
            return false;
        }

        let entries = next.len();
        *self.map.write() = Arc::new(next);

        let change = self.changes.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(cache = self.label, entries, change, "cache replaced");
        true
    }

    /// Drop every entry
    ///
    /// Same as replacing with no entities.
    pub fn clear(&self) -> bool {
        self.replace(std::iter::empty())
    }

    fn accepts(&self, entity: &E) -> bool {
        match &self.filter {
            Some(keep) => keep(entity),
            None => true,
        }
    }

    /// On key collisions the entry with the greater `(order_key, value)`
    /// wins, which makes the result independent of input order even for
    /// entities sharing an order key.
    fn build<'a, I>(&self, entities: I) -> CacheMap<P, E>
    where
        I: IntoIterator<Item = &'a E>,
        E: 'a,
    {
        let mut winners: HashMap<P::Key, (String, P::Value)> = HashMap::new();
        let mut pairs = Vec::new();

        for entity in entities.into_iter().filter(|entity| self.accepts(entity)) {
            let order = self.projection.order_key(entity);
            self.projection.project(entity, &mut pairs);

            for (key, value) in pairs.drain(..) {
                match winners.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert((order.clone(), value));
                    }
                    Entry::Occupied(mut slot) => {
                        let (held_order, held_value) = slot.get();
                        if (&order, &value) > (held_order, held_value) {
                            slot.insert((order.clone(), value));
                        }
                    }
                }
            }
        }

        winners
            .into_iter()
            .map(|(key, (_, value))| (key, value))
            .collect()
    }

    /// Value for `key`
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<P::Value>
    where
        P::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.read().get(key).cloned()
    }

    /// Whether `key` is present
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        P::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.read().contains_key(key)
    }

    /// Current map
    ///
    /// The returned map stays valid after later replacements.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CacheMap<P, E>> {
        Arc::clone(&self.map.read())
    }

    /// Number of keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Whether the cache holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Monotonic counter of effective changes
    #[inline]
    #[must_use]
    pub fn change_count(&self) -> u64 {
        self.changes.load(Ordering::Acquire)
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.len(),
            change_count: self.change_count(),
        }
    }
}

impl<E, P: Projection<E>> fmt::Debug for DerivedCache<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedCache")
            .field("label", &self.label)
            .field("filtered", &self.filter.is_some())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::FnProjection;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
    struct Room {
        id: &'static str,
        alias: Option<&'static str>,
        name: &'static str,
        is_space: bool,
    }

    fn room(id: &'static str, name: &'static str) -> Room {
        Room {
            id,
            alias: None,
            name,
            is_space: false,
        }
    }

    fn names() -> DerivedCache<Room, impl Projection<Room, Key = String, Value = String>> {
        DerivedCache::new(
            "names",
            FnProjection::new(
                |r: &Room| r.id.to_string(),
                |r: &Room| {
                    let mut pairs = vec![(r.id.to_string(), r.name.to_string())];
                    if let Some(alias) = r.alias {
                        pairs.push((alias.to_string(), r.name.to_string()));
                    }
                    pairs
                },
            ),
        )
    }

    #[test]
    fn starts_empty() {
        let cache = names();
        assert!(cache.is_empty());
        assert_eq!(cache.change_count(), 0);
        assert_eq!(cache.get("!a"), None);
    }

    #[test]
    fn indexes_id_and_alias() {
        let cache = names();
        let mut a = room("!a", "Alpha");
        a.alias = Some("#alpha:example.org");

        assert!(cache.replace(&[a, room("!b", "Beta")]));

        assert_eq!(cache.get("!a").as_deref(), Some("Alpha"));
        assert_eq!(cache.get("#alpha:example.org").as_deref(), Some("Alpha"));
        assert_eq!(cache.get("!b").as_deref(), Some("Beta"));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.change_count(), 1);
    }

    #[test]
    fn replace_drops_entries_not_resupplied() {
        let cache = names();
        cache.replace(&[room("!a", "Alpha"), room("!b", "Beta")]);
        cache.replace(&[room("!b", "Beta")]);

        assert_eq!(cache.get("!a"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.change_count(), 2);
    }

    #[test]
    fn unchanged_replace_keeps_counter() {
        let cache = names();
        let rooms = [room("!a", "Alpha"), room("!b", "Beta")];
        assert!(cache.replace(&rooms));

        let reordered = [rooms[1].clone(), rooms[0].clone()];
        assert!(!cache.replace(&reordered));
        assert_eq!(cache.change_count(), 1);
    }

    #[test]
    fn colliding_keys_resolve_by_order_key() {
        let cache = names();
        let mut a = room("!a", "Alpha");
        a.alias = Some("#shared:example.org");
        let mut b = room("!b", "Beta");
        b.alias = Some("#shared:example.org");

        cache.replace(&[a.clone(), b.clone()]);
        let first = cache.snapshot();
        cache.replace(&[b, a]);
        let second = cache.snapshot();

        assert_eq!(first, second);
        assert_eq!(cache.get("#shared:example.org").as_deref(), Some("Beta"));
    }

    #[test]
    fn equal_order_keys_resolve_by_value() {
        let cache = names();
        cache.replace(&[room("!r", "Old"), room("!r", "New")]);
        let first = cache.snapshot();
        cache.replace(&[room("!r", "New"), room("!r", "Old")]);

        assert_eq!(first, cache.snapshot());
        assert_eq!(cache.get("!r").as_deref(), Some("Old"));
        assert_eq!(cache.change_count(), 1);
    }

    #[test]
    fn clear_empties_and_counts_once() {
        let cache = names();
        cache.replace(&[room("!a", "Alpha")]);

        assert!(cache.clear());
        assert!(!cache.clear());
        assert!(cache.is_empty());
        assert_eq!(cache.change_count(), 2);
    }

    #[test]
    fn reads_proceed_while_snapshot_is_held() {
        let cache = names();
        cache.replace(&[room("!a", "Alpha")]);
        let held = cache.snapshot();

        assert!(cache.replace(&[room("!a", "Alpha"), room("!b", "Beta")]));
        assert_eq!(cache.get("!b").as_deref(), Some("Beta"));
        assert_eq!(held.len(), 1);
    }

    #[test]
    fn filter_excludes_non_matching_entities() {
        let spaces = DerivedCache::new(
            "spaces",
            FnProjection::new(
                |r: &Room| r.id.to_string(),
                |r: &Room| vec![(r.id.to_string(), r.clone())],
            ),
        )
        .with_filter(|r: &Room| r.is_space);

        let mut space = room("!s", "Space");
        space.is_space = true;
        spaces.replace(&[room("!a", "Alpha"), space.clone()]);

        assert_eq!(spaces.get("!s"), Some(space));
        assert_eq!(spaces.get("!a"), None);
        assert_eq!(spaces.len(), 1);
    }

    #[test]
    fn filter_drops_entity_that_stops_matching() {
        let spaces = DerivedCache::new(
            "spaces",
            FnProjection::new(
                |r: &Room| r.id.to_string(),
                |r: &Room| vec![(r.id.to_string(), r.name)],
            ),
        )
        .with_filter(|r: &Room| r.is_space);

        let mut s = room("!s", "Space");
        s.is_space = true;
        spaces.replace(std::slice::from_ref(&s));
        assert!(spaces.contains_key("!s"));

        s.is_space = false;
        spaces.replace(std::slice::from_ref(&s));
        assert!(!spaces.contains_key("!s"));
        assert_eq!(spaces.change_count(), 2);
    }

    #[test]
    fn snapshot_survives_replacement() {
        let cache = names();
        cache.replace(&[room("!a", "Alpha")]);
        let before = cache.snapshot();
        cache.replace(&[room("!a", "Renamed")]);

        assert_eq!(before.get("!a").map(String::as_str), Some("Alpha"));
        assert_eq!(cache.get("!a").as_deref(), Some("Renamed"));
    }

    #[test]
    fn stats_report_entries_and_changes() {
        let cache = names();
        cache.replace(&[room("!a", "Alpha"), room("!b", "Beta")]);
        assert_eq!(
            cache.stats(),
            CacheStats {
                entry_count: 2,
                change_count: 1,
            }
        );
    }
}
