//! Embedding cache.
//!
//! Caches computed embeddings so re-ingesting unchanged content never
//! re-calls the provider. Keys are SHA-256 over `text | model`, so a key
//! is unique per content and per model, and stable across restarts.
//! This is also what makes repeated ingestion bit-stable: the cached
//! vector is returned as-is.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Statistics for cache performance monitoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entry_count: usize,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// In-memory LRU cache for embedding vectors.
///
/// Bounded by entry count; least recently used entries are evicted when
/// the cache is full. Thread-safe via `parking_lot::Mutex` (the LRU list
/// mutates on reads too, so a read/write split buys nothing).
pub struct EmbeddingCache {
    cache: Mutex<LruCache<String, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` embeddings.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Compute the cache key for a text under a given model.
    pub fn compute_key(&self, text: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(b"|");
        hasher.update(model.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Get an embedding, promoting it to most recently used.
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut cache = self.cache.lock();
        match cache.get(key) {
            Some(embedding) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(embedding.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store an embedding, evicting the least recently used entry if full.
    pub fn set(&self, key: &str, embedding: Vec<f32>) {
        let mut cache = self.cache.lock();
        // push returns the displaced entry; same-key returns mean an update,
        // not an eviction.
        if let Some((old_key, _)) = cache.push(key.to_string(), embedding) {
            if old_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count: self.cache.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_computation() {
        let cache = EmbeddingCache::new(16);

        let key1 = cache.compute_key("hello world", "nomic-embed-text");
        let key2 = cache.compute_key("hello world", "nomic-embed-text");
        let key3 = cache.compute_key("hello world", "other-model");
        let key4 = cache.compute_key("different text", "nomic-embed-text");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
        assert_ne!(key1, key4);
    }

    #[test]
    fn test_set_and_get() {
        let cache = EmbeddingCache::new(16);
        let embedding = vec![1.0, 2.0, 3.0];

        assert!(cache.get("key").is_none());
        assert_eq!(cache.stats().misses, 1);

        cache.set("key", embedding.clone());
        assert_eq!(cache.get("key"), Some(embedding));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = EmbeddingCache::new(2);

        cache.set("key1", vec![1.0]);
        cache.set("key2", vec![2.0]);

        // Touch key1 so key2 becomes least recently used.
        assert!(cache.get("key1").is_some());

        cache.set("key3", vec![3.0]);

        assert!(cache.get("key2").is_none());
        assert!(cache.get("key1").is_some());
        assert!(cache.get("key3").is_some());
        assert!(cache.stats().evictions > 0);
    }

    #[test]
    fn test_update_existing_key() {
        let cache = EmbeddingCache::new(4);

        cache.set("key", vec![1.0]);
        cache.set("key", vec![2.0, 3.0]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("key"), Some(vec![2.0, 3.0]));
    }

    #[test]
    fn test_clear() {
        let cache = EmbeddingCache::new(4);
        cache.set("key1", vec![1.0]);
        cache.set("key2", vec![2.0]);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 75,
            misses: 25,
            evictions: 0,
            entry_count: 0,
        };
        assert!((stats.hit_rate() - 75.0).abs() < 0.001);
    }
}
