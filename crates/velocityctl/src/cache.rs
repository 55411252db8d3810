//! REPL answer cache.
//!
//! Repeating a question inside one session returns the earlier result
//! without touching the network. Keys are the query lowercased with
//! whitespace collapsed; entries expire after a TTL and the least recently
//! used one is dropped when the cache is full.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use velocity_core::ExecutionResult;

use crate::config::CacheConfig;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: ExecutionResult,
    inserted_at: Instant,
}

pub struct QueryCache {
    entries: LruCache<String, CacheEntry>,
    /// Zero means entries never expire
    ttl: Duration,
    hits: u64,
    misses: u64,
}

impl QueryCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(capacity),
            ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Cache sized by config, or None when caching is off
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let capacity = NonZeroUsize::new(config.max_entries)?;
        Some(Self::new(capacity, Duration::from_secs(config.ttl_secs)))
    }

    pub fn key(query: &str) -> String {
        query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    fn expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        !self.ttl.is_zero() && now.duration_since(entry.inserted_at) > self.ttl
    }

    pub fn get(&mut self, query: &str) -> Option<ExecutionResult> {
        let key = Self::key(query);
        let now = Instant::now();

        let expired = match self.entries.peek(&key) {
            Some(entry) => self.expired(entry, now),
            None => {
                self.misses += 1;
                return None;
            }
        };
        if expired {
            debug!("Cache expired: {}", key);
            self.entries.pop(&key);
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        debug!("Cache hit: {}", key);
        self.entries.get(&key).map(|entry| entry.result.clone())
    }

    pub fn put(&mut self, query: &str, result: ExecutionResult) {
        let entry = CacheEntry {
            result,
            inserted_at: Instant::now(),
        };
        if let Some((evicted, _)) = self.entries.push(Self::key(query), entry) {
            if evicted != Self::key(query) {
                debug!("Cache evicted: {}", evicted);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn stats_line(&self) -> String {
        format!(
            "{}/{} entries, {} hits, {} misses ({:.0}% hit rate)",
            self.len(),
            self.entries.cap(),
            self.hits,
            self.misses,
            self.hit_rate() * 100.0
        )
    }
}
