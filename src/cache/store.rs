//! Memory Cache Module
//!
//! Bounded in-process cache combining HashMap storage with a pluggable
//! eviction policy and lazy TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EvictionPolicy, OrderTracker};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Memory Cache ==
/// Bounded key-value cache with TTL expiry and LRU or FIFO eviction.
///
/// Owns its values exclusively; `get` hands out clones. Capacity is enforced
/// before insertion, so the cache never holds more than `max_size` entries.
#[derive(Debug)]
pub struct MemoryCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Per-key ordering used for eviction
    order: OrderTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_size: usize,
    /// TTL for entries stored without an explicit one
    default_ttl: Duration,
}

impl<V: Clone> MemoryCache<V> {
    // == Constructor ==
    /// Creates a cache from configuration.
    ///
    /// Fails if `max_size` or the default TTL is zero.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_capacity(config.max_size, config.ttl, config.strategy)
    }

    /// Creates a cache with explicit capacity, default TTL and policy.
    pub fn with_capacity(
        max_size: usize,
        default_ttl: Duration,
        policy: EvictionPolicy,
    ) -> Result<Self> {
        if max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size must be greater than zero".to_string(),
            ));
        }
        if default_ttl.is_zero() {
            return Err(CacheError::InvalidConfig(
                "default ttl must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            entries: HashMap::new(),
            order: OrderTracker::new(policy),
            stats: CacheStats::new(max_size, policy),
            max_size,
            default_ttl,
        })
    }

    // == Set ==
    /// Stores a value under `key`, replacing any previous value.
    ///
    /// Expired entries are swept first. If the key is new and the cache is
    /// still full, exactly one entry is evicted per the configured policy.
    /// Under FIFO an overwrite keeps the key's original eviction position.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL (uses the configured default if None)
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> Result<()> {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl(key));
        }

        self.cleanup();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict_one();
        }

        self.entries.insert(key.clone(), CacheEntry::new(value, ttl));
        self.order.record_write(&key);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries are removed and counted as misses. A hit refreshes the
    /// key's recency under LRU.
    pub fn get(&mut self, key: &str) -> Option<V> {
        if !self.is_live(key) {
            self.stats.record_miss();
            return None;
        }

        let value = self.entries.get(key).map(|entry| entry.value.clone());
        self.stats.record_hit();
        self.order.record_read(key);
        value
    }

    // == Has ==
    /// Checks whether a live entry exists.
    ///
    /// Same lazy expiry as `get`, but leaves LRU order and hit/miss counters
    /// untouched.
    pub fn has(&mut self, key: &str) -> bool {
        self.is_live(key)
    }

    /// Removes `key` if it has expired; returns whether a live entry remains.
    fn is_live(&mut self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.remove_entry(key);
                self.stats.record_expirations(1);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    // == Delete ==
    /// Removes an entry by key; returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    /// Removes every entry whose key matches `predicate`; returns the count.
    pub fn delete_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();

        for key in &matching {
            self.remove_entry(key);
        }
        matching.len()
    }

    // == Clear ==
    /// Removes all entries and resets the access counter.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.set_total_entries(0);
    }

    // == Size ==
    /// Number of live entries, measured after sweeping expired ones.
    pub fn size(&mut self) -> usize {
        self.cleanup();
        self.entries.len()
    }

    // == Keys ==
    /// Live keys, next eviction candidate first.
    pub fn keys(&mut self) -> Vec<String> {
        self.cleanup();
        self.order.ordered_keys()
    }

    // == Cleanup ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.remove_entry(&key);
        }

        self.stats.record_expirations(count);
        count
    }

    fn evict_one(&mut self) {
        let Some(victim) = self.order.victim().map(str::to_string) else {
            return;
        };

        debug!(key = %victim, policy = %self.order.policy(), "Evicting cache entry");
        self.remove_entry(&victim);
        self.stats.record_eviction();
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        self.order.remove(key);
        let removed = self.entries.remove(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        removed
    }
}

impl<V> MemoryCache<V> {
    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Raw entry count, including expired entries not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.order.policy()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
