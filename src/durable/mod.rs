//! Durable Cache Module
//!
//! Persistent, prefix-scoped cache with optional compression, plus the
//! storage backends it runs on.

pub mod codec;
mod storage;
mod store;

pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::DurableCache;
