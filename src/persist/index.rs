//! Response Index
//!
//! In-memory side of the persistent store: identity to response, bounded by
//! a maximum entry count with least-recently-used eviction.

use std::collections::HashMap;

use crate::cache::LruTracker;
use crate::persist::StoredResponse;

#[derive(Debug)]
pub struct ResponseIndex {
    entries: HashMap<String, StoredResponse>,
    lru: LruTracker,
    limit: usize,
}

impl ResponseIndex {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the entry and marks it recently used.
    pub fn get(&mut self, id: &str) -> Option<&StoredResponse> {
        if self.entries.contains_key(id) {
            self.lru.touch(id);
        }
        self.entries.get(id)
    }

    pub fn peek(&self, id: &str) -> Option<&StoredResponse> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    // == Removal Candidate ==
    /// The entry an insert of `id` would displace: the least recently used
    /// entry other than `id`, when the index is full and `id` is new.
    pub fn removal_candidate(&self, id: &str) -> Option<String> {
        if self.entries.len() < self.limit || self.contains(id) {
            return None;
        }
        self.lru.least_recent_except(id).map(str::to_string)
    }

    // == Insert ==
    /// Stores `entry` under `id`, evicting least recently used entries other
    /// than `id` until the limit holds. Returns the replaced entry.
    pub fn insert(&mut self, id: String, entry: StoredResponse) -> Option<StoredResponse> {
        self.lru.touch(&id);
        let previous = self.entries.insert(id.clone(), entry);
        while self.entries.len() > self.limit {
            match self.lru.pop_least_recent_except(&id) {
                Some(evicted) => {
                    self.entries.remove(&evicted);
                }
                None => break,
            }
        }
        previous
    }

    pub fn remove(&mut self, id: &str) -> Option<StoredResponse> {
        self.lru.remove(id);
        self.entries.remove(id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }
}
