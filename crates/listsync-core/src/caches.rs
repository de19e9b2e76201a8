//! Lookup caches fed by room and member scopes
//!
//! Each cache is a [`DerivedCache`] over the materialized items of one
//! scope. Placeholders never produce entries.

use crate::member::MemberProfile;
use crate::room::{RoomSummary, RoomSummaryDetails};
use crate::scope::SnapshotSink;
use listsync_cache::{DerivedCache, Projection};
use listsync_diff::MaterializedList;

/// Display name by room id and by canonical alias
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayNameProjection;

impl Projection<RoomSummary> for DisplayNameProjection {
    type Key = String;
    type Value = String;

    fn order_key(&self, entity: &RoomSummary) -> String {
        entity.sort_key().to_owned()
    }

    fn project(&self, entity: &RoomSummary, out: &mut Vec<(String, String)>) {
        let Some(details) = entity.details() else {
            return;
        };
        out.push((details.room_id.clone(), details.name.clone()));
        if let Some(alias) = &details.canonical_alias {
            out.push((alias.clone(), details.name.clone()));
        }
    }
}

/// Full room details by room id
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomDetailsProjection;

impl Projection<RoomSummary> for RoomDetailsProjection {
    type Key = String;
    type Value = RoomSummaryDetails;

    fn order_key(&self, entity: &RoomSummary) -> String {
        entity.sort_key().to_owned()
    }

    fn project(&self, entity: &RoomSummary, out: &mut Vec<(String, RoomSummaryDetails)>) {
        if let Some(details) = entity.details() {
            out.push((details.room_id.clone(), details.clone()));
        }
    }
}

/// Member profile by user id
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberProfileProjection;

impl Projection<MemberProfile> for MemberProfileProjection {
    type Key = String;
    type Value = MemberProfile;

    fn order_key(&self, entity: &MemberProfile) -> String {
        entity.user_id.clone()
    }

    fn project(&self, entity: &MemberProfile, out: &mut Vec<(String, MemberProfile)>) {
        out.push((entity.user_id.clone(), entity.clone()));
    }
}

/// Display name by room id or alias
pub type RoomDisplayNameCache = DerivedCache<RoomSummary, DisplayNameProjection>;

/// Room details by id, optionally filtered
pub type RoomDetailsCache = DerivedCache<RoomSummary, RoomDetailsProjection>;

/// Member profile by user id
pub type MemberProfileCache = DerivedCache<MemberProfile, MemberProfileProjection>;

/// Create an empty member profile cache
#[must_use]
pub fn member_profile_cache() -> MemberProfileCache {
    DerivedCache::new("member_profiles", MemberProfileProjection)
}

/// Caches derived from the session room list
#[derive(Debug)]
pub struct RoomCaches {
    display_names: RoomDisplayNameCache,
    rooms: RoomDetailsCache,
    spaces: RoomDetailsCache,
}

impl RoomCaches {
    /// Create empty caches
    #[must_use]
    pub fn new() -> Self {
        Self {
            display_names: DerivedCache::new("room_display_names", DisplayNameProjection),
            rooms: DerivedCache::new("rooms", RoomDetailsProjection),
            spaces: DerivedCache::new("spaces", RoomDetailsProjection)
                .with_filter(|summary: &RoomSummary| {
                    summary.details().is_some_and(|details| details.is_space)
                }),
        }
    }

    /// Rebuild every cache from `summaries`
    pub fn replace<'a, I>(&self, summaries: I)
    where
        I: IntoIterator<Item = &'a RoomSummary> + Clone,
    {
        self.display_names.replace(summaries.clone());
        self.rooms.replace(summaries.clone());
        self.spaces.replace(summaries);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.display_names.clear();
        self.rooms.clear();
        self.spaces.clear();
    }

    /// Display name for a room id or canonical alias
    #[must_use]
    pub fn display_name(&self, key: &str) -> Option<String> {
        self.display_names.get(key)
    }

    /// Room details by id
    #[must_use]
    pub fn room(&self, room_id: &str) -> Option<RoomSummaryDetails> {
        self.rooms.get(room_id)
    }

    /// Space details by id; `None` for rooms that are not spaces
    #[must_use]
    pub fn space(&self, space_id: &str) -> Option<RoomSummaryDetails> {
        self.spaces.get(space_id)
    }

    /// Display name cache
    #[inline]
    #[must_use]
    pub fn display_names(&self) -> &RoomDisplayNameCache {
        &self.display_names
    }

    /// Room details cache
    #[inline]
    #[must_use]
    pub fn rooms(&self) -> &RoomDetailsCache {
        &self.rooms
    }

    /// Space cache
    #[inline]
    #[must_use]
    pub fn spaces(&self) -> &RoomDetailsCache {
        &self.spaces
    }
}

impl Default for RoomCaches {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSink<RoomSummary> for RoomCaches {
    fn on_snapshot(&self, snapshot: &MaterializedList<RoomSummary>) {
        self.replace(snapshot.items());
    }

    fn on_close(&self) {
        self.clear();
    }
}
