//! Property tests for full-replacement caches.

use listsync_cache::{DerivedCache, FnProjection, Projection};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Entity {
    id: String,
    alias: Option<String>,
    label: String,
    is_space: bool,
}

fn entity() -> impl Strategy<Value = Entity> {
    (
        "[a-e]",
        prop::option::of("[a-c]"),
        "[A-Z][a-z]{0,4}",
        any::<bool>(),
    )
        .prop_map(|(id, alias, label, is_space)| Entity {
            id: format!("!{id}"),
            alias: alias.map(|a| format!("#{a}")),
            label,
            is_space,
        })
}

fn labels() -> DerivedCache<Entity, impl Projection<Entity, Key = String, Value = String>> {
    DerivedCache::new(
        "labels",
        FnProjection::new(
            |e: &Entity| e.id.clone(),
            |e: &Entity| {
                let mut pairs = vec![(e.id.clone(), e.label.clone())];
                if let Some(alias) = &e.alias {
                    pairs.push((alias.clone(), e.label.clone()));
                }
                pairs
            },
        ),
    )
}

/// Keep one entity per id so that the input is a set.
fn dedup_by_id(mut entities: Vec<Entity>) -> Vec<Entity> {
    entities.sort_by(|a, b| a.id.cmp(&b.id));
    entities.dedup_by(|a, b| a.id == b.id);
    entities
}

proptest! {
    #[test]
    fn prop_replace_is_order_independent(
        entities in prop::collection::vec(entity(), 0..10),
        shuffle in any::<prop::sample::Index>(),
    ) {
        let entities = dedup_by_id(entities);
        let mut reordered = entities.clone();
        if !reordered.is_empty() {
            let pivot = shuffle.index(reordered.len());
            reordered.rotate_left(pivot);
            reordered.reverse();
        }

        let cache = labels();
        cache.replace(&entities);
        let first = cache.snapshot();
        let changes = cache.change_count();

        cache.replace(&reordered);
        prop_assert_eq!(&*first, &*cache.snapshot());
        prop_assert_eq!(cache.change_count(), changes);
    }

    #[test]
    fn prop_duplicate_ids_are_order_independent(
        entities in prop::collection::vec(entity(), 0..10),
        shuffle in any::<prop::sample::Index>(),
    ) {
        let mut reordered = entities.clone();
        if !reordered.is_empty() {
            let pivot = shuffle.index(reordered.len());
            reordered.rotate_left(pivot);
            reordered.reverse();
        }

        let forward = labels();
        forward.replace(&entities);
        let backward = labels();
        backward.replace(&reordered);
        prop_assert_eq!(&*forward.snapshot(), &*backward.snapshot());

        forward.replace(&reordered);
        prop_assert!(forward.change_count() <= 1);
    }

    #[test]
    fn prop_content_depends_only_on_last_replace(
        earlier in prop::collection::vec(entity(), 0..10),
        latest in prop::collection::vec(entity(), 0..10),
    ) {
        let latest = dedup_by_id(latest);

        let warm = labels();
        warm.replace(&dedup_by_id(earlier));
        warm.replace(&latest);

        let fresh = labels();
        fresh.replace(&latest);

        prop_assert_eq!(&*warm.snapshot(), &*fresh.snapshot());
    }

    #[test]
    fn prop_space_filter_never_returns_rooms(
        entities in prop::collection::vec(entity(), 0..12),
    ) {
        let spaces = DerivedCache::new(
            "spaces",
            FnProjection::new(
                |e: &Entity| e.id.clone(),
                |e: &Entity| vec![(e.id.clone(), e.clone())],
            ),
        )
        .with_filter(|e: &Entity| e.is_space);

        spaces.replace(&entities);

        for e in &entities {
            if let Some(found) = spaces.get(e.id.as_str()) {
                prop_assert!(found.is_space);
            }
        }
        prop_assert!(spaces.snapshot().values().all(|e| e.is_space));
    }
}
