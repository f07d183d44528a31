//! Bounded In-Memory Cache
//!
//! Time-based cache with a hard capacity. Entries expire a fixed time
//! after insertion; reads never extend their lifetime.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Time- and size-bounded cache
pub struct TtlCache<T> {
    data: HashMap<String, (T, Instant)>,
    ttl: Duration,
    capacity: usize,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            data: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|(value, inserted)| {
            if inserted.elapsed() < self.ttl {
                Some(value)
            } else {
                None
            }
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert a value, evicting expired entries first and then the oldest
    /// entry if the cache is still full.
    pub fn set(&mut self, key: String, value: T) {
        if !self.data.contains_key(&key) && self.data.len() >= self.capacity {
            self.cleanup();
            if self.data.len() >= self.capacity {
                let oldest = self
                    .data
                    .iter()
                    .min_by_key(|(_, (_, inserted))| *inserted)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    self.data.remove(&oldest);
                }
            }
        }
        self.data.insert(key, (value, Instant::now()));
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    /// Remove expired entries, returning how many were dropped
    pub fn cleanup(&mut self) -> usize {
        let before = self.data.len();
        let ttl = self.ttl;
        self.data.retain(|_, (_, inserted)| inserted.elapsed() < ttl);
        before - self.data.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_cache_basic() {
        let mut cache: TtlCache<String> = TtlCache::new(Duration::from_secs(10), 4);

        cache.set("key1".to_string(), "value1".to_string());
        assert_eq!(cache.get("key1"), Some(&"value1".to_string()));
        assert_eq!(cache.get("key2"), None);
    }

    #[test]
    fn test_cache_expiry() {
        let mut cache: TtlCache<String> = TtlCache::new(Duration::from_millis(50), 4);

        cache.set("key1".to_string(), "value1".to_string());
        assert!(cache.contains("key1"));

        sleep(Duration::from_millis(80));
        assert_eq!(cache.get("key1"), None);
        assert_eq!(cache.cleanup(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(10), 2);

        cache.set("a".into(), 1);
        sleep(Duration::from_millis(2));
        cache.set("b".into(), 2);
        cache.set("c".into(), 3);

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert_eq!(cache.get("c"), Some(&3));
    }

    #[test]
    fn test_invalidate() {
        let mut cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(10), 2);
        cache.set("a".into(), 1);
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
    }
}
