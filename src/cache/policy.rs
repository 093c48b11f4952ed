//! Eviction Policy Module
//!
//! Tracks per-key ordering counters used to pick eviction victims.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// == Eviction Policy ==
/// Rule for choosing which entry to discard when the cache is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the least recently read or written key
    #[default]
    Lru,
    /// Evict the first inserted key; overwrites keep their original position
    Fifo,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => f.write_str("lru"),
            EvictionPolicy::Fifo => f.write_str("fifo"),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "fifo" => Ok(EvictionPolicy::Fifo),
            other => Err(format!("unknown eviction strategy '{}'", other)),
        }
    }
}

// == Order Tracker ==
/// Records a monotonically increasing counter per key.
///
/// Under LRU every read and write re-stamps the key; under FIFO only the first
/// insertion does. Either way the victim is the key with the smallest counter.
#[derive(Debug)]
pub struct OrderTracker {
    policy: EvictionPolicy,
    /// Counter value recorded per key
    order: HashMap<String, u64>,
    /// Next counter value to hand out
    counter: u64,
}

impl OrderTracker {
    // == Constructor ==
    /// Creates an empty tracker for the given policy.
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            order: HashMap::new(),
            counter: 0,
        }
    }

    // == Record Write ==
    /// Records a `set` of `key`.
    pub fn record_write(&mut self, key: &str) {
        match self.policy {
            EvictionPolicy::Lru => self.stamp(key),
            EvictionPolicy::Fifo => {
                if !self.order.contains_key(key) {
                    self.stamp(key);
                }
            }
        }
    }

    // == Record Read ==
    /// Records a successful `get` of `key`. Only LRU cares.
    pub fn record_read(&mut self, key: &str) {
        if self.policy == EvictionPolicy::Lru && self.order.contains_key(key) {
            self.stamp(key);
        }
    }

    fn stamp(&mut self, key: &str) {
        self.counter += 1;
        self.order.insert(key.to_string(), self.counter);
    }

    // == Remove ==
    /// Forgets a key.
    pub fn remove(&mut self, key: &str) {
        self.order.remove(key);
    }

    // == Victim ==
    /// Returns the key that should be evicted next, without removing it.
    ///
    /// Linear scan; the cache is bounded and small.
    pub fn victim(&self) -> Option<&str> {
        self.order
            .iter()
            .min_by_key(|(_, stamp)| **stamp)
            .map(|(key, _)| key.as_str())
    }

    // == Ordered Keys ==
    /// All tracked keys, next eviction candidate first.
    pub fn ordered_keys(&self) -> Vec<String> {
        let mut keys: Vec<(&String, &u64)> = self.order.iter().collect();
        keys.sort_by_key(|(_, stamp)| **stamp);
        keys.into_iter().map(|(key, _)| key.clone()).collect()
    }

    // == Clear ==
    /// Drops every record and resets the counter to its initial value.
    pub fn clear(&mut self) {
        self.order.clear();
        self.counter = 0;
    }

    /// Current counter value.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }
}
