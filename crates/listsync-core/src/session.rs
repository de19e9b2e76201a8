//! Session: the scopes and caches of one signed-in account
//!
//! - The session room list feeds display name, room and space caches,
//!   which are emptied whenever that list stops
//! - Each space gets its own child-room list, which feeds no cache
//! - Each open room gets a member list with its own profile cache

use crate::caches::{member_profile_cache, MemberProfileCache, RoomCaches};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::member::MemberProfile;
use crate::registry::ScopeRegistry;
use crate::room::{RoomListEntry, RoomSummary, RoomSummaryDetails, RoomSummaryFactory};
use crate::scope::{ScopeHandle, ScopeId, SnapshotSink};
use crate::upstream::UpstreamControl;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Handle to a room-list scope
pub type RoomListHandle = ScopeHandle<RoomListEntry, RoomSummary>;

/// Handle to a member-list scope
pub type MemberListHandle = ScopeHandle<MemberProfile, MemberProfile>;

fn member_identity(member: MemberProfile) -> MemberProfile {
    member
}

/// Scopes and derived caches of one session
#[derive(Debug)]
pub struct Session {
    rooms: ScopeRegistry<RoomListEntry, RoomSummary>,
    members: ScopeRegistry<MemberProfile, MemberProfile>,
    room_caches: Arc<RoomCaches>,
    member_caches: DashMap<String, Arc<MemberProfileCache>>,
}

impl Session {
    /// Create session with no open scopes
    ///
    /// # Errors
    /// Returns `SyncError::Config` if `config` fails validation.
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            rooms: ScopeRegistry::new(config.clone()),
            members: ScopeRegistry::new(config),
            room_caches: Arc::new(RoomCaches::new()),
            member_caches: DashMap::new(),
        })
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        self.rooms.config()
    }

    /// Registry of room-list scopes (session list and spaces)
    #[inline]
    #[must_use]
    pub fn rooms(&self) -> &ScopeRegistry<RoomListEntry, RoomSummary> {
        &self.rooms
    }

    /// Registry of member-list scopes
    #[inline]
    #[must_use]
    pub fn members(&self) -> &ScopeRegistry<MemberProfile, MemberProfile> {
        &self.members
    }

    /// Caches derived from the session room list
    #[inline]
    #[must_use]
    pub fn room_caches(&self) -> &RoomCaches {
        &self.room_caches
    }

    /// Start the session room list
    ///
    /// # Errors
    /// Returns `SyncError::DuplicateScope` if it is already running.
    pub fn start_room_list(
        &self,
        upstream: Arc<dyn UpstreamControl>,
    ) -> Result<RoomListHandle, SyncError> {
        let caches: Arc<dyn SnapshotSink<RoomSummary>> = self.room_caches.clone();
        self.rooms.open_with_sinks(
            ScopeId::all_rooms(),
            RoomSummaryFactory,
            upstream,
            vec![caches],
        )
    }

    /// Stop the session room list and empty its caches
    pub async fn close_room_list(&self) -> bool {
        self.rooms.close(&ScopeId::all_rooms()).await
    }

    /// Open the child-room list of a space
    ///
    /// # Errors
    /// Returns `SyncError::DuplicateScope` if it is already open.
    pub fn open_space(
        &self,
        space_id: &str,
        upstream: Arc<dyn UpstreamControl>,
    ) -> Result<RoomListHandle, SyncError> {
        self.rooms
            .open(ScopeId::space(space_id), RoomSummaryFactory, upstream)
    }

    /// Close the child-room list of a space
    pub async fn close_space(&self, space_id: &str) -> bool {
        self.rooms.close(&ScopeId::space(space_id)).await
    }

    /// Open the member list of a room
    ///
    /// # Errors
    /// Returns `SyncError::DuplicateScope` if it is already open.
    pub fn open_room_members(
        &self,
        room_id: &str,
        upstream: Arc<dyn UpstreamControl>,
    ) -> Result<MemberListHandle, SyncError> {
        let cache = Arc::new(member_profile_cache());
        let sink: Arc<dyn SnapshotSink<MemberProfile>> = cache.clone();
        let handle = self.members.open_with_sinks(
            ScopeId::room_members(room_id),
            member_identity,
            upstream,
            vec![sink],
        )?;
        self.member_caches.insert(room_id.to_owned(), cache);
        Ok(handle)
    }

    /// Close the member list of a room and drop its cache
    pub async fn close_room_members(&self, room_id: &str) -> bool {
        let closed = self.members.close(&ScopeId::room_members(room_id)).await;
        self.member_caches.remove(room_id);
        closed
    }

    /// Display name for a room id or canonical alias
    #[must_use]
    pub fn lookup_display_name(&self, key: &str) -> Option<String> {
        self.room_caches.display_name(key)
    }

    /// Room details by id
    #[must_use]
    pub fn lookup_room(&self, room_id: &str) -> Option<RoomSummaryDetails> {
        self.room_caches.room(room_id)
    }

    /// Space details by id; rooms that are not spaces are absent
    #[must_use]
    pub fn lookup_space(&self, space_id: &str) -> Option<RoomSummaryDetails> {
        self.room_caches.space(space_id)
    }

    /// Member profile in an open room
    #[must_use]
    pub fn lookup_member(&self, room_id: &str, user_id: &str) -> Option<MemberProfile> {
        self.member_caches.get(room_id)?.get(user_id)
    }

    /// Close every scope
    pub async fn shutdown(&self) {
        self.rooms.close_all().await;
        self.members.close_all().await;
        self.member_caches.clear();
        info!("session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferPolicy;
    use crate::upstream::Detached;

    #[test]
    fn rejects_invalid_config() {
        let config = SyncConfig::new().with_buffer_policy(BufferPolicy::DropOldest { capacity: 0 });
        assert!(matches!(Session::new(config), Err(SyncError::Config(_))));
    }

    #[tokio::test]
    async fn room_list_starts_once() {
        let session = Session::new(SyncConfig::default()).unwrap();
        session.start_room_list(Arc::new(Detached)).unwrap();
        assert!(matches!(
            session.start_room_list(Arc::new(Detached)),
            Err(SyncError::DuplicateScope(_))
        ));
        session.shutdown().await;
        assert!(session.rooms().is_empty());
    }

    #[tokio::test]
    async fn room_caches_follow_room_list_lifetime() {
        let session = Session::new(SyncConfig::default()).unwrap();
        let rooms = session.start_room_list(Arc::new(Detached)).unwrap();
        let mut list = rooms.observe_list();
        rooms
            .push_diff(vec![listsync_diff::DiffOperation::Reset {
                values: vec![RoomListEntry::Filled(
                    crate::room::RoomInfo::new("!a:x").with_name("Alpha"),
                )],
            }])
            .await
            .unwrap();
        while list.next().await.is_some_and(|s| s.is_empty()) {}
        assert_eq!(session.lookup_display_name("!a:x").as_deref(), Some("Alpha"));

        assert!(session.close_room_list().await);
        assert_eq!(session.lookup_display_name("!a:x"), None);
        assert_eq!(session.lookup_room("!a:x"), None);
        assert!(!session.close_room_list().await);
    }

    #[tokio::test]
    async fn member_cache_follows_scope_lifetime() {
        let session = Session::new(SyncConfig::default()).unwrap();
        session.open_room_members("!r:x", Arc::new(Detached)).unwrap();
        assert_eq!(session.lookup_member("!r:x", "@a:x"), None);

        assert!(session.close_room_members("!r:x").await);
        assert!(!session.close_room_members("!r:x").await);
    }
}
