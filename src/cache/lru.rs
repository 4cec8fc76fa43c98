//! LRU Tracker Module
//!
//! Recency ordering shared by the object index and the response index.

use std::collections::VecDeque;

// == LRU Tracker ==
/// Tracks key usage order for least-recently-used eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Least recently used
/// - Back = Most recently used
#[derive(Debug, Default, Clone)]
pub struct LruTracker {
    order: VecDeque<String>,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as the most recently used one.
    pub fn touch(&mut self, key: &str) {
        if self.order.back().is_some_and(|k| k == key) {
            return;
        }
        self.remove(key);
        self.order.push_back(key.to_string());
    }

    // == Remove ==
    /// Stops tracking a key. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    // == Pop Least Recent ==
    /// Removes and returns the least recently used key.
    pub fn pop_least_recent(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    // == Least Recent Except ==
    /// Returns the least recently used key other than `excluded`, without
    /// removing it.
    pub fn least_recent_except(&self, excluded: &str) -> Option<&str> {
        self.order
            .iter()
            .find(|k| k.as_str() != excluded)
            .map(String::as_str)
    }

    /// Removes and returns the least recently used key other than `excluded`.
    pub fn pop_least_recent_except(&mut self, excluded: &str) -> Option<String> {
        let pos = self.order.iter().position(|k| k != excluded)?;
        self.order.remove(pos)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}
