//! Room list items
//!
//! The room list diff stream carries [`RoomListEntry`] values. Entries
//! that upstream has not loaded yet arrive as `Empty` and become
//! placeholder summaries with a fresh random id, so a list of N slots
//! always renders N rows.

use crate::entity::Identified;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room data as delivered by upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    /// Room identifier, e.g. `!abc:example.org`
    pub room_id: String,
    /// Computed display name
    pub name: Option<String>,
    /// Canonical alias, e.g. `#rust:example.org`
    pub canonical_alias: Option<String>,
    /// Avatar location
    pub avatar_url: Option<String>,
    /// Whether this is a direct chat
    #[serde(default)]
    pub is_direct: bool,
    /// Whether this room is a space
    #[serde(default)]
    pub is_space: bool,
    /// Unread notifications
    #[serde(default)]
    pub unread_notification_count: u32,
    /// Timestamp of the latest message, in milliseconds
    pub last_message_timestamp: Option<u64>,
}

impl RoomInfo {
    /// Create room info with only an id
    #[must_use]
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            name: None,
            canonical_alias: None,
            avatar_url: None,
            is_direct: false,
            is_space: false,
            unread_notification_count: 0,
            last_message_timestamp: None,
        }
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With canonical alias
    #[inline]
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.canonical_alias = Some(alias.into());
        self
    }

    /// Mark as a space
    #[inline]
    #[must_use]
    pub fn as_space(mut self) -> Self {
        self.is_space = true;
        self
    }

    /// Mark as a direct chat
    #[inline]
    #[must_use]
    pub fn as_direct(mut self) -> Self {
        self.is_direct = true;
        self
    }

    /// With unread notification count
    #[inline]
    #[must_use]
    pub fn with_unread(mut self, count: u32) -> Self {
        self.unread_notification_count = count;
        self
    }
}

/// One slot of the upstream room list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "room", rename_all = "snake_case")]
pub enum RoomListEntry {
    /// Slot exists but the room is not loaded
    Empty,
    /// Room data may be stale
    Invalidated(RoomInfo),
    /// Room data is current
    Filled(RoomInfo),
}

impl RoomListEntry {
    /// Room data, if loaded
    #[must_use]
    pub fn room(&self) -> Option<&RoomInfo> {
        match self {
            Self::Empty => None,
            Self::Invalidated(room) | Self::Filled(room) => Some(room),
        }
    }
}

impl Identified for RoomListEntry {
    fn identifier(&self) -> Option<&str> {
        self.room().map(|room| room.room_id.as_str())
    }
}

/// Materialized room data shown in lists
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomSummaryDetails {
    /// Room identifier
    pub room_id: String,
    /// Display name, falling back to alias then id
    pub name: String,
    /// Canonical alias
    pub canonical_alias: Option<String>,
    /// Avatar location
    pub avatar_url: Option<String>,
    /// Whether this is a direct chat
    pub is_direct: bool,
    /// Whether this room is a space
    pub is_space: bool,
    /// Unread notifications
    pub unread_notification_count: u32,
    /// Timestamp of the latest message, in milliseconds
    pub last_message_timestamp: Option<u64>,
}

impl From<RoomInfo> for RoomSummaryDetails {
    fn from(info: RoomInfo) -> Self {
        let name = info
            .name
            .clone()
            .or_else(|| info.canonical_alias.clone())
            .unwrap_or_else(|| info.room_id.clone());

        Self {
            room_id: info.room_id,
            name,
            canonical_alias: info.canonical_alias,
            avatar_url: info.avatar_url,
            is_direct: info.is_direct,
            is_space: info.is_space,
            unread_notification_count: info.unread_notification_count,
            last_message_timestamp: info.last_message_timestamp,
        }
    }
}

/// Materialized room list item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoomSummary {
    /// Placeholder for a slot upstream has not loaded
    Empty {
        /// Random id distinguishing placeholders
        placeholder_id: String,
    },
    /// Loaded room
    Filled(RoomSummaryDetails),
}

impl RoomSummary {
    /// Details, if loaded
    #[must_use]
    pub fn details(&self) -> Option<&RoomSummaryDetails> {
        match self {
            Self::Empty { .. } => None,
            Self::Filled(details) => Some(details),
        }
    }

    /// Whether this is a placeholder
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    /// Id used for stable ordering: room id or placeholder id
    #[must_use]
    pub fn sort_key(&self) -> &str {
        match self {
            Self::Empty { placeholder_id } => placeholder_id,
            Self::Filled(details) => &details.room_id,
        }
    }
}

impl Identified for RoomSummary {
    fn identifier(&self) -> Option<&str> {
        self.details().map(|details| details.room_id.as_str())
    }
}

/// Maps room list entries to summaries
///
/// `Invalidated` entries are shown with the data they carry; upstream
/// follows them with a `Set` once fresh data is in.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomSummaryFactory;

impl RoomSummaryFactory {
    /// Build the summary for one entry
    #[must_use]
    pub fn create(&self, entry: RoomListEntry) -> RoomSummary {
        match entry {
            RoomListEntry::Empty => Self::placeholder(),
            RoomListEntry::Invalidated(room) | RoomListEntry::Filled(room) => {
                RoomSummary::Filled(room.into())
            }
        }
    }

    /// Fresh placeholder summary
    #[must_use]
    pub fn placeholder() -> RoomSummary {
        RoomSummary::Empty {
            placeholder_id: Uuid::new_v4().to_string(),
        }
    }
}

impl listsync_diff::ItemMapper<RoomListEntry> for RoomSummaryFactory {
    type Item = RoomSummary;

    fn materialize(&self, raw: RoomListEntry) -> RoomSummary {
        self.create(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_entries_get_distinct_placeholders() {
        let factory = RoomSummaryFactory;
        let a = factory.create(RoomListEntry::Empty);
        let b = factory.create(RoomListEntry::Empty);

        assert!(a.is_placeholder());
        assert_ne!(a, b);
        assert_eq!(a.identifier(), None);
    }

    #[test]
    fn invalidated_and_filled_materialize_alike() {
        let factory = RoomSummaryFactory;
        let info = RoomInfo::new("!a:example.org").with_name("Alpha");

        assert_eq!(
            factory.create(RoomListEntry::Invalidated(info.clone())),
            factory.create(RoomListEntry::Filled(info))
        );
    }

    #[test]
    fn name_falls_back_to_alias_then_id() {
        let aliased = RoomSummaryDetails::from(
            RoomInfo::new("!a:example.org").with_alias("#alpha:example.org"),
        );
        assert_eq!(aliased.name, "#alpha:example.org");

        let bare = RoomSummaryDetails::from(RoomInfo::new("!b:example.org"));
        assert_eq!(bare.name, "!b:example.org");
    }

    #[test]
    fn entry_serde_shape() {
        let entry = RoomListEntry::Filled(RoomInfo::new("!a:example.org"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["state"], "filled");
        assert_eq!(json["room"]["room_id"], "!a:example.org");

        let empty: RoomListEntry = serde_json::from_str(r#"{"state":"empty"}"#).unwrap();
        assert_eq!(empty, RoomListEntry::Empty);
    }
}
