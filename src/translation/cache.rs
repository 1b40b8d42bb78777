//! In-process translation cache (tier 1).
//!
//! Insertion-ordered map capped at 1000 entries; when the cap is exceeded
//! the oldest 20% are evicted in one pass. Entries are immutable once
//! written apart from overwrite on an identical key.

use std::collections::{HashMap, VecDeque};

pub const MEMORY_CACHE_CAPACITY: usize = 1000;

pub struct MemoryCache {
    map: HashMap<String, (String, f32)>,
    order: VecDeque<String>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    pub fn key(text: &str, src: &str, tgt: &str) -> String {
        format!("{}\u{1f}{}\u{1f}{}", text, src, tgt)
    }

    pub fn get(&mut self, key: &str) -> Option<(String, f32)> {
        match self.map.get(key) {
            Some(entry) => {
                self.hits += 1;
                Some(entry.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: String, translated: String, confidence: f32) {
        if !self.map.contains_key(&key) {
            if self.map.len() >= self.capacity {
                self.evict_oldest();
            }
            self.order.push_back(key.clone());
        }
        self.map.insert(key, (translated, confidence));
    }

    /// Drop the oldest 20% of entries by insertion order.
    fn evict_oldest(&mut self) {
        let evict = (self.capacity / 5).max(1);
        for _ in 0..evict {
            match self.order.pop_front() {
                Some(old) => {
                    self.map.remove(&old);
                }
                None => break,
            }
        }
        log::debug!("memory cache evicted {} oldest entries", evict);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_after_insert() {
        let mut cache = MemoryCache::new(10);
        let key = MemoryCache::key("hello", "en", "fr");
        cache.insert(key.clone(), "bonjour".to_string(), 1.0);
        assert_eq!(cache.get(&key), Some(("bonjour".to_string(), 1.0)));
        assert_eq!(cache.stats(), (1, 0));
    }

    #[test]
    fn miss_is_counted() {
        let mut cache = MemoryCache::new(10);
        assert!(cache.get("nope").is_none());
        assert_eq!(cache.stats(), (0, 1));
    }

    #[test]
    fn keys_distinguish_language_pairs() {
        let a = MemoryCache::key("hello", "en", "fr");
        let b = MemoryCache::key("hello", "en", "de");
        assert_ne!(a, b);
    }

    #[test]
    fn eviction_drops_oldest_fifth() {
        let mut cache = MemoryCache::new(100);
        for i in 0..100 {
            cache.insert(format!("k{}", i), "v".to_string(), 1.0);
        }
        assert_eq!(cache.len(), 100);

        // One past capacity triggers a 20-entry sweep
        cache.insert("overflow".to_string(), "v".to_string(), 1.0);
        assert_eq!(cache.len(), 81);

        // The oldest entries are gone, the newest survive
        assert!(cache.get("k0").is_none());
        assert!(cache.get("k19").is_none());
        assert!(cache.get("k20").is_some());
        assert!(cache.get("overflow").is_some());
    }

    #[test]
    fn overwrite_same_key_does_not_grow() {
        let mut cache = MemoryCache::new(10);
        cache.insert("k".to_string(), "v1".to_string(), 1.0);
        cache.insert("k".to_string(), "v2".to_string(), 0.85);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), Some(("v2".to_string(), 0.85)));
    }
}
