//! List loading progress
//!
//! Upstream reports how much of a list it has delivered. Until a list is
//! [`ListLoadingState::FullyLoaded`], in-place refreshes are dropped: the
//! positions they would address are still moving.

use crate::config::BufferPolicy;
use crate::observable::{Observable, Publisher};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// How much of a list upstream has delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListLoadingState {
    /// Nothing received yet
    #[default]
    NotLoaded,
    /// Restored from a local cache, not yet confirmed by the server
    Preloaded,
    /// Some ranges received
    PartiallyLoaded,
    /// Every entry received
    FullyLoaded,
}

impl ListLoadingState {
    /// Whether every entry has been received
    #[inline]
    #[must_use]
    pub const fn is_fully_loaded(self) -> bool {
        matches!(self, Self::FullyLoaded)
    }

    /// Get as string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotLoaded => "not_loaded",
            Self::Preloaded => "preloaded",
            Self::PartiallyLoaded => "partially_loaded",
            Self::FullyLoaded => "fully_loaded",
        }
    }
}

impl fmt::Display for ListLoadingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable loading state, driven by upstream events
#[derive(Debug)]
pub struct LoadingTracker {
    state: Publisher<ListLoadingState>,
}

impl LoadingTracker {
    /// Create in [`ListLoadingState::NotLoaded`]
    #[must_use]
    pub fn new(policy: BufferPolicy) -> Self {
        Self {
            state: Publisher::with_initial(policy, ListLoadingState::NotLoaded),
        }
    }

    /// Apply an upstream loading event
    pub fn on_upstream(&mut self, state: ListLoadingState) {
        trace!(%state, "loading state");
        self.state.publish(state);
    }

    /// Current state
    #[must_use]
    pub fn current(&self) -> ListLoadingState {
        self.state.get().unwrap_or_default()
    }

    /// Read handle
    #[must_use]
    pub fn observable(&self) -> Observable<ListLoadingState> {
        self.state.observable()
    }
}
