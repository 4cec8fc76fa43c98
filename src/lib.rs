//! Catalog Cache - client-side caching for a marketplace catalog service
//!
//! Two layers sit between a client and the remote catalog:
//! - [`CachingMarketplaceService`] memoizes decoded query results in memory,
//!   bounded by entry count with LRU eviction and a time-to-live.
//! - [`PersistentResponseStore`] keeps raw HTTP responses on disk, one file
//!   per request identity, so they survive a restart.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod persist;
pub mod service;
pub mod staleness;
pub mod tasks;

pub use cache::{CacheStats, CachingMarketplaceService, SearchKey};
pub use config::Config;
pub use error::{CacheError, Result};
pub use persist::{FileNamer, PersistentResponseStore, StoredResponse};
pub use service::{MarketplaceService, ServiceError, ServiceResult};
pub use staleness::{DefaultStalenessPolicy, StalenessPolicy};
pub use tasks::{spawn_purge_task, spawn_reconcile_task};
