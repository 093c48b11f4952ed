//! Cache Module
//!
//! Provides the bounded in-memory cache with TTL expiration and LRU or FIFO
//! eviction.

mod entry;
mod policy;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use policy::{EvictionPolicy, OrderTracker};
pub use stats::CacheStats;
pub use store::MemoryCache;
