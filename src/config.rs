//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding persisted HTTP responses
    pub cache_dir: PathBuf,
    /// Maximum number of entries in the persistent response store
    pub max_response_entries: usize,
    /// Maximum number of entries in the in-memory object cache
    pub max_object_entries: usize,
    /// Object cache TTL in seconds, 0 = entries never expire
    pub object_ttl: u64,
    /// Background reconcile interval in seconds
    pub reconcile_interval: u64,
    /// Stale-while-revalidate grace period in seconds, 0 = disabled
    pub max_stale: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CATALOG_CACHE_DIR` - Response store directory (default: platform cache dir)
    /// - `MAX_RESPONSE_ENTRIES` - Persistent store capacity (default: 2000)
    /// - `MAX_OBJECT_ENTRIES` - Object cache capacity (default: 1000)
    /// - `OBJECT_TTL` - Object cache TTL in seconds (default: 3600)
    /// - `RECONCILE_INTERVAL` - Reconcile frequency in seconds (default: 300)
    /// - `MAX_STALE` - Stale-while-revalidate grace in seconds (default: 43200)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var_os("CATALOG_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            max_response_entries: parse_var("MAX_RESPONSE_ENTRIES")
                .unwrap_or(defaults.max_response_entries),
            max_object_entries: parse_var("MAX_OBJECT_ENTRIES")
                .unwrap_or(defaults.max_object_entries),
            object_ttl: parse_var("OBJECT_TTL").unwrap_or(defaults.object_ttl),
            reconcile_interval: parse_var("RECONCILE_INTERVAL")
                .unwrap_or(defaults.reconcile_interval),
            max_stale: parse_var("MAX_STALE").unwrap_or(defaults.max_stale),
        }
    }

    /// Rejects capacities that would make either cache unusable.
    pub fn validate(&self) -> Result<()> {
        if self.max_response_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "max_response_entries must be at least 1".to_string(),
            ));
        }
        if self.max_object_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "max_object_entries must be at least 1".to_string(),
            ));
        }
        if self.reconcile_interval == 0 {
            return Err(CacheError::InvalidConfig(
                "reconcile_interval must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Object TTL as a duration, `None` when expiry is disabled.
    pub fn object_ttl(&self) -> Option<Duration> {
        (self.object_ttl > 0).then(|| Duration::from_secs(self.object_ttl))
    }

    /// Grace period as a duration, `None` when decoration is disabled.
    pub fn max_stale(&self) -> Option<Duration> {
        (self.max_stale > 0).then(|| Duration::from_secs(self.max_stale))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_response_entries: 2000,
            max_object_entries: 1000,
            object_ttl: 3600,
            reconcile_interval: 300,
            max_stale: 12 * 60 * 60,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "catalog-cache")
        .map(|dirs| dirs.cache_dir().join("http"))
        .unwrap_or_else(|| env::temp_dir().join("catalog-cache").join("http"))
}
