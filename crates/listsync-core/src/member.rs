//! Room member profiles

use crate::entity::Identified;
use serde::{Deserialize, Serialize};

/// Membership state of a user in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    /// Joined
    #[default]
    Join,
    /// Invited
    Invite,
    /// Asked to join
    Knock,
    /// Left
    Leave,
    /// Banned
    Ban,
}

/// Member of a room, as listed by upstream
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberProfile {
    /// User identifier, e.g. `@alice:example.org`
    pub user_id: String,
    /// Per-room display name
    pub display_name: Option<String>,
    /// Avatar location
    pub avatar_url: Option<String>,
    /// Membership state
    #[serde(default)]
    pub membership: Membership,
    /// Power level in the room
    #[serde(default)]
    pub power_level: i64,
}

impl MemberProfile {
    /// Joined member with only a user id
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            avatar_url: None,
            membership: Membership::Join,
            power_level: 0,
        }
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// With avatar
    #[inline]
    #[must_use]
    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// With membership state
    #[inline]
    #[must_use]
    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.membership = membership;
        self
    }

    /// Name to show: display name, else user id
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.user_id)
    }
}

impl Identified for MemberProfile {
    fn identifier(&self) -> Option<&str> {
        Some(self.user_id.as_str())
    }
}
