//! Pagination status tracking
//!
//! The local state machine mirrors upstream one-for-one. Paginating is a
//! request sent upstream; the resulting `Loading`/`Idle` transitions come
//! back through [`PaginationStateMachine::on_upstream`].

use crate::config::BufferPolicy;
use crate::observable::{Observable, Publisher};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Pagination status of one list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaginationStatus {
    /// Nothing in flight
    Idle {
        /// Whether upstream has more items to page in
        has_more_to_load: bool,
    },
    /// A page is being fetched
    Loading,
}

impl PaginationStatus {
    /// Status before upstream has reported anything
    pub const INITIAL: Self = Self::Idle {
        has_more_to_load: false,
    };

    /// Idle status with the given flag
    #[inline]
    #[must_use]
    pub const fn idle(has_more_to_load: bool) -> Self {
        Self::Idle { has_more_to_load }
    }

    /// Whether a page is being fetched
    #[inline]
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether upstream reported more items to load
    #[inline]
    #[must_use]
    pub const fn has_more_to_load(self) -> bool {
        matches!(
            self,
            Self::Idle {
                has_more_to_load: true
            }
        )
    }
}

impl Default for PaginationStatus {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for PaginationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle { has_more_to_load } => write!(f, "idle(has_more={has_more_to_load})"),
            Self::Loading => f.write_str("loading"),
        }
    }
}

/// Observable pagination status, driven by upstream events
///
/// Every upstream event is republished as is, including repeats.
#[derive(Debug)]
pub struct PaginationStateMachine {
    status: Publisher<PaginationStatus>,
    transitions: u64,
}

impl PaginationStateMachine {
    /// Create in [`PaginationStatus::INITIAL`]
    #[must_use]
    pub fn new(policy: BufferPolicy) -> Self {
        Self {
            status: Publisher::with_initial(policy, PaginationStatus::INITIAL),
            transitions: 0,
        }
    }

    /// Apply an upstream status event
    pub fn on_upstream(&mut self, status: PaginationStatus) {
        trace!(%status, "pagination status");
        self.transitions += 1;
        self.status.publish(status);
    }

    /// Current status
    #[must_use]
    pub fn current(&self) -> PaginationStatus {
        self.status.get().unwrap_or_default()
    }

    /// Number of upstream events applied
    #[inline]
    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Read handle
    #[must_use]
    pub fn observable(&self) -> Observable<PaginationStatus> {
        self.status.observable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_without_more() {
        let machine = PaginationStateMachine::new(BufferPolicy::Unbounded);
        assert_eq!(machine.current(), PaginationStatus::idle(false));
        assert!(!machine.current().has_more_to_load());
    }

    #[test]
    fn round_trip_is_not_coalesced() {
        let mut machine = PaginationStateMachine::new(BufferPolicy::Unbounded);
        let mut subscriber = machine.observable().subscribe();

        machine.on_upstream(PaginationStatus::idle(false));
        machine.on_upstream(PaginationStatus::Loading);
        machine.on_upstream(PaginationStatus::idle(true));
        machine.on_upstream(PaginationStatus::idle(true));

        assert_eq!(
            subscriber.drain(),
            vec![
                PaginationStatus::INITIAL,
                PaginationStatus::idle(false),
                PaginationStatus::Loading,
                PaginationStatus::idle(true),
                PaginationStatus::idle(true),
            ]
        );
        assert_eq!(machine.transitions(), 4);
    }

    #[test]
    fn display_and_predicates() {
        assert_eq!(PaginationStatus::Loading.to_string(), "loading");
        assert_eq!(
            PaginationStatus::idle(true).to_string(),
            "idle(has_more=true)"
        );
        assert!(PaginationStatus::Loading.is_loading());
    }
}
