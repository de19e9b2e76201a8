//! listsync Derived Caches
//!
//! Lookup tables recomputed from the full set of entities in a reconciled
//! list, for key-based reads without scanning the list.
//!
//! # Core Concepts
//!
//! - [`Projection`]: Turns one entity into zero or more `(key, value)` entries
//! - [`DerivedCache`]: Full-replacement map with an optional subtype filter
//!   and a change counter
//!
//! # Example
//!
//! ```rust
//! use listsync_cache::{DerivedCache, FnProjection};
//!
//! let cache = DerivedCache::new(
//!     "lengths",
//!     FnProjection::new(
//!         |word: &String| word.clone(),
//!         |word: &String| vec![(word.clone(), word.len())],
//!     ),
//! );
//!
//! cache.replace(&["room".to_string(), "space".to_string()]);
//! assert_eq!(cache.get("space"), Some(5));
//! assert_eq!(cache.change_count(), 1);
//! ```

#![warn(unreachable_pub)]

mod cache;
mod projection;

pub use cache::{CacheMap, CacheStats, DerivedCache, EntityFilter};
pub use projection::{FnProjection, Projection};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
