//! Bounded record of targets already acted upon.
//!
//! Shared across polling cycles for the lifetime of the task. When full,
//! the oldest block of entries is evicted before appending.

use std::collections::VecDeque;
use std::sync::Mutex;

use metrics::gauge;

use crate::ingest::types::LocationHash;

pub const HANDLED_CACHE_CAPACITY: usize = 300;
pub const HANDLED_CACHE_EVICTION: usize = 25;

#[derive(Debug)]
pub struct HandledCache {
    inner: Mutex<VecDeque<LocationHash>>,
    cap: usize,
    evict: usize,
}

impl Default for HandledCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HandledCache {
    pub fn new() -> Self {
        Self::with_limits(HANDLED_CACHE_CAPACITY, HANDLED_CACHE_EVICTION)
    }

    /// `evict` is clamped to `1..=cap` so an insert always fits.
    pub fn with_limits(cap: usize, evict: usize) -> Self {
        let cap = cap.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap)),
            cap,
            evict: evict.clamp(1, cap),
        }
    }

    pub fn contains(&self, hash: &LocationHash) -> bool {
        self.inner
            .lock()
            .expect("handled cache mutex poisoned")
            .contains(hash)
    }

    /// Record `hash` once. Returns false if it was already present.
    pub fn insert(&self, hash: LocationHash) -> bool {
        let mut v = self.inner.lock().expect("handled cache mutex poisoned");
        if v.contains(&hash) {
            return false;
        }
        if v.len() >= self.cap {
            v.drain(..self.evict);
        }
        v.push_back(hash);
        gauge!("sniper_handled_cache_size").set(v.len() as f64);
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("handled cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<LocationHash> {
        self.inner
            .lock()
            .expect("handled cache mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(i: usize) -> LocationHash {
        LocationHash::new(i as f64, 0.0)
    }

    #[test]
    fn full_cache_evicts_oldest_block() {
        let cache = HandledCache::new();
        for i in 0..300 {
            assert!(cache.insert(h(i)));
        }
        assert_eq!(cache.len(), 300);

        assert!(cache.insert(h(300)));
        assert_eq!(cache.len(), 276);
        assert!(!cache.contains(&h(24)));
        assert!(cache.contains(&h(25)));
        assert_eq!(cache.snapshot().last(), Some(&h(300)));
    }

    #[test]
    fn duplicates_are_recorded_once() {
        let cache = HandledCache::new();
        assert!(cache.insert(h(1)));
        assert!(!cache.insert(h(1)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn never_exceeds_capacity() {
        let cache = HandledCache::with_limits(10, 3);
        for i in 0..1_000 {
            cache.insert(h(i));
            assert!(cache.len() <= 10);
        }
    }
}
