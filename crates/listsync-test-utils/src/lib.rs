//! Testing utilities for listsync workspace
//!
//! Shared fixtures and a recording upstream.

#![allow(missing_docs)]

use listsync_core::{MemberProfile, RoomInfo, RoomListEntry, UpstreamControl};
use listsync_diff::DiffOperation;
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn a_room(room_id: &str, name: &str) -> RoomInfo {
    RoomInfo::new(room_id).with_name(name)
}

pub fn a_space(room_id: &str, name: &str) -> RoomInfo {
    a_room(room_id, name).as_space()
}

pub fn a_member(user_id: &str, name: &str) -> MemberProfile {
    MemberProfile::new(user_id).with_display_name(name)
}

pub fn filled(info: RoomInfo) -> RoomListEntry {
    RoomListEntry::Filled(info)
}

pub fn empty() -> RoomListEntry {
    RoomListEntry::Empty
}

pub fn reset_rooms(rooms: Vec<RoomInfo>) -> Vec<DiffOperation<RoomListEntry>> {
    vec![DiffOperation::Reset {
        values: rooms.into_iter().map(filled).collect(),
    }]
}

/// Upstream that records every request it receives
#[derive(Debug)]
pub struct RecordingUpstream {
    more: AtomicUsize,
    resets: AtomicUsize,
    supports_reset: AtomicBool,
    ranges: Mutex<Vec<Range<usize>>>,
}

impl RecordingUpstream {
    /// Upstream that accepts reset requests
    pub fn new() -> Self {
        Self {
            more: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
            supports_reset: AtomicBool::new(true),
            ranges: Mutex::new(Vec::new()),
        }
    }

    /// Upstream that refuses reset requests
    pub fn without_reset() -> Self {
        let upstream = Self::new();
        upstream.supports_reset.store(false, Ordering::SeqCst);
        upstream
    }

    pub fn more_requests(&self) -> usize {
        self.more.load(Ordering::SeqCst)
    }

    pub fn reset_requests(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn visible_ranges(&self) -> Vec<Range<usize>> {
        self.ranges.lock().clone()
    }
}

impl Default for RecordingUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamControl for RecordingUpstream {
    fn request_more(&self) {
        self.more.fetch_add(1, Ordering::SeqCst);
    }

    fn request_reset(&self) -> bool {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.supports_reset.load(Ordering::SeqCst)
    }

    fn set_visible_range(&self, range: Range<usize>) {
        self.ranges.lock().push(range);
    }
}
