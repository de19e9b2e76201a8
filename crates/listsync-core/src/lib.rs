//! listsync Core - Scoped List Replicas
//!
//! Keeps local, observable replicas of server-maintained lists:
//! - Runs one single-writer scope per list (room list, space, member list)
//! - Publishes one immutable snapshot per applied diff batch
//! - Tracks upstream pagination status per scope
//! - Detects desynchronized diff streams and waits for a full reset
//! - Feeds derived lookup caches from every snapshot
//!
//! # Example
//!
//! ```rust
//! use listsync_core::prelude::*;
//! use listsync_core::room::RoomInfo;
//! use listsync_diff::DiffOperation;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SyncError> {
//! let session = Session::new(SyncConfig::default())?;
//! let rooms = session.start_room_list(Arc::new(Detached))?;
//! let mut list = rooms.observe_list();
//!
//! rooms
//!     .push_diff(vec![DiffOperation::PushBack {
//!         value: RoomListEntry::Filled(RoomInfo::new("!a:x").with_name("Alpha")),
//!     }])
//!     .await?;
//!
//! assert!(list.next().await.is_some_and(|snapshot| snapshot.is_empty()));
//! assert_eq!(list.next().await.map(|snapshot| snapshot.len()), Some(1));
//! assert_eq!(session.lookup_display_name("!a:x").as_deref(), Some("Alpha"));
//!
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod caches;
pub mod config;
pub mod entity;
pub mod error;
pub mod loading;
pub mod member;
pub mod observable;
pub mod pagination;
pub mod registry;
pub mod room;
pub mod scope;
pub mod session;
pub mod telemetry;
pub mod upstream;

// Re-exports for convenience
pub use caches::{
    member_profile_cache, DisplayNameProjection, MemberProfileCache, MemberProfileProjection,
    RoomCaches, RoomDetailsCache, RoomDetailsProjection, RoomDisplayNameCache,
};
pub use config::{BufferPolicy, LogFormat, SyncConfig};
pub use entity::Identified;
pub use error::{ConfigError, SyncError};
pub use loading::{ListLoadingState, LoadingTracker};
pub use member::{MemberProfile, Membership};
pub use observable::{Observable, Publisher, Subscriber};
pub use pagination::{PaginationStateMachine, PaginationStatus};
pub use registry::ScopeRegistry;
pub use room::{RoomInfo, RoomListEntry, RoomSummary, RoomSummaryDetails, RoomSummaryFactory};
pub use scope::{
    BatchOutcome, ListScope, ScopeCommand, ScopeHandle, ScopeId, ScopeWriter, SnapshotSink,
    SyncState,
};
pub use session::{MemberListHandle, RoomListHandle, Session};
pub use upstream::{Detached, UpstreamControl};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with listsync Core
    pub use crate::{
        BatchOutcome, BufferPolicy, Detached, Identified, ListLoadingState, PaginationStatus,
        RoomListEntry, RoomSummary, ScopeHandle, ScopeId, Session, Subscriber, SyncConfig, SyncError,
        SyncState, UpstreamControl,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use listsync_diff::DiffOperation;
    use std::sync::Arc;

    fn member(user_id: &str, name: &str) -> MemberProfile {
        MemberProfile::new(user_id).with_display_name(name)
    }

    #[tokio::test]
    async fn member_list_feeds_profile_lookup() {
        let session = Session::new(SyncConfig::default()).unwrap();
        let members = session
            .open_room_members("!room:x", Arc::new(Detached))
            .unwrap();
        let mut list = members.observe_list();

        members
            .push_diff(vec![DiffOperation::Append {
                values: vec![member("@alice:x", "Alice"), member("@bob:x", "Bob")],
            }])
            .await
            .unwrap();

        list.next().await.unwrap();
        assert_eq!(list.next().await.unwrap().len(), 2);
        assert_eq!(
            session
                .lookup_member("!room:x", "@bob:x")
                .map(|profile| profile.name().to_owned()),
            Some("Bob".to_owned())
        );
        assert_eq!(session.lookup_member("!other:x", "@bob:x"), None);

        session.shutdown().await;
        assert_eq!(session.lookup_member("!room:x", "@bob:x"), None);
    }

    #[test]
    fn scope_ids_are_namespaced() {
        assert_eq!(ScopeId::space("!s:x").as_str(), "space:!s:x");
        assert_eq!(ScopeId::room_members("!r:x").as_str(), "members:!r:x");
        assert_ne!(ScopeId::space("a"), ScopeId::room_members("a"));
    }
}
