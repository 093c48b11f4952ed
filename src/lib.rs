//! Resilient Cache - caching and resilient request layer
//!
//! Provides a bounded, time-aware memory cache with LRU or FIFO eviction, a
//! durable prefix-scoped cache with optional compression, and a request
//! client that adds cache-aside reads, request deduplication, per-attempt
//! timeouts and bounded fixed-delay retries on top of a pluggable transport.

pub mod cache;
pub mod client;
pub mod config;
pub mod durable;
pub mod error;
pub mod models;
pub mod tasks;

pub use cache::{CacheStats, EvictionPolicy, MemoryCache};
pub use client::{RequestClient, RequestOptions, ReqwestTransport, Transport};
pub use config::{CacheConfig, DurableConfig};
pub use durable::{DurableCache, FileStorage, MemoryStorage, StorageBackend};
pub use error::{CacheError, RequestError, Result};
pub use models::{ApiResponse, BatchRequest, HttpRequest, HttpResponse, Method};
pub use tasks::{spawn_durable_cleanup_task, spawn_memory_cleanup_task};
