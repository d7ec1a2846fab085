//! Cache Module
//!
//! Resilient cache client over pluggable backends (Redis or in-memory),
//! with bounded reconnection and a cool-down after repeated failures.

mod backend;
mod client;
mod entry;
mod memory;
mod redis;
mod state;
mod stats;


// Re-export public types
pub use backend::{CacheConnection, CacheConnector};
pub use client::{ResilientCacheClient, DEFAULT_TTL_SECONDS};
pub use entry::CacheEntry;
pub use memory::{MemoryConnector, MemoryStore, SharedStore};
pub use self::redis::{RedisConnector, DEFAULT_REDIS_PORT};
pub use state::{
    Attempt, ConnectionPhase, ConnectionState, RetryPolicy, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_COOLDOWN, MIN_RETRY_COOLDOWN,
};
pub use stats::CacheStats;
