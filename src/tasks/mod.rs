//! Background Tasks Module
//!
//! Periodic sweeps for caches whose owners want expired entries reclaimed
//! without waiting for a read.

mod cleanup;

pub use cleanup::{spawn_durable_cleanup_task, spawn_memory_cleanup_task};
