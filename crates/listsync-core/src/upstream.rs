//! Requests flowing back to the source of a diff stream

use std::ops::Range;

/// Control surface of the upstream list source
///
/// All calls are fire-and-forget. Results arrive, if at all, through the
/// scope's normal diff and pagination channels.
pub trait UpstreamControl: Send + Sync {
    /// Ask for the next page of items
    fn request_more(&self);

    /// Ask for a full `Reset` of the list
    ///
    /// Returns `false` if the source cannot resend the list.
    fn request_reset(&self) -> bool {
        false
    }

    /// Tell the source which indices are on screen
    fn set_visible_range(&self, range: Range<usize>) {
        let _ = range;
    }
}

/// Upstream that ignores every request
///
/// Used for scopes whose source is fed from elsewhere, like replays.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl UpstreamControl for Detached {
    fn request_more(&self) {}
}
