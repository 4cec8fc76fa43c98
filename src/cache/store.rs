//! Object Index Module
//!
//! Bounded map behind the object cache, combining HashMap storage with LRU
//! tracking and TTL expiration. Expired entries count as reclaimed: they are
//! dropped on access and reported as misses.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheStats, CachedItem, LruTracker, ObjectEntry};

// == Object Index ==
#[derive(Debug)]
pub struct ObjectIndex {
    entries: HashMap<String, ObjectEntry>,
    lru: LruTracker,
    stats: CacheStats,
    /// Maximum number of entries, at least one
    max_entries: usize,
    ttl: Option<Duration>,
}

impl ObjectIndex {
    pub fn new(max_entries: usize, ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    // == Insert ==
    /// Stores an item, replacing any entry under the same key.
    ///
    /// A new key on a full index first reclaims expired entries, then evicts
    /// the least recently used entry if none had expired.
    pub fn insert(&mut self, key: String, item: CachedItem, origin_url: Option<String>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.purge_expired();
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.lru.pop_least_recent_except(&key) {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                debug!(key = %evicted, "evicted object cache entry");
            }
        }

        let entry = ObjectEntry::new(key.clone(), item, origin_url, self.ttl);
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Returns the live entry under `key`, marks it recently used and counts
    /// the lookup as a hit or miss.
    pub fn get(&mut self, key: &str) -> Option<&ObjectEntry> {
        let hit = self.access(key).is_some();
        self.record_lookup(hit);
        if hit {
            self.entries.get(key)
        } else {
            None
        }
    }

    /// Like [`get`](Self::get) but leaves hit and miss counting to the
    /// caller, for lookups that span several keys. Expired entries are
    /// still dropped and counted.
    pub fn access(&mut self, key: &str) -> Option<&ObjectEntry> {
        let expired = self.entries.get(key)?.is_expired();
        if expired {
            self.drop_entry(key);
            self.stats.record_expirations(1);
            self.stats.set_total_entries(self.entries.len());
            return None;
        }

        self.lru.touch(key);
        self.entries.get(key)
    }

    pub fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
    }

    /// Returns the live entry under `key` without touching recency or stats.
    pub fn peek(&self, key: &str) -> Option<&ObjectEntry> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    // == Remove ==
    /// Removes an entry, returning whether one was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.drop_entry(key);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Purge Expired ==
    /// Removes all expired entries and returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.drop_entry(key);
        }

        self.stats.record_expirations(expired.len());
        self.stats.set_total_entries(self.entries.len());
        expired.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn drop_entry(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }
}
