//! Keyed query cache with fetch dedup, staleness tracking, invalidation
//! and snapshot/rollback support.

pub mod entry;
pub mod key;
pub mod store;

pub use entry::{CacheSnapshot, CachedValue, QueryStatus};
pub use key::{PageMarker, QueryKey, ResourceKind};
pub use store::{CacheEvent, CacheEventKind, QueryCache};
