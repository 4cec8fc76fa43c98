//! Cache Module
//!
//! In-memory object cache for marketplace query results, bounded by entry
//! count with LRU eviction and an optional time-to-live.

mod entry;
pub mod keys;
mod lru;
mod service;
mod stats;
mod store;


// Re-export public types
pub use entry::{CachedItem, Cacheable, KeyedItem, ObjectEntry};
pub use keys::{EntityKeys, SearchKey};
pub use lru::LruTracker;
pub use service::CachingMarketplaceService;
pub use stats::CacheStats;
pub use store::ObjectIndex;
