//! Cache Backend Traits
//!
//! The seam between the resilient client and a concrete key/value store.
//! A connector creates fresh low-level clients; a connection runs commands.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CacheResult;

/// An open connection to a key/value store.
#[async_trait]
pub trait CacheConnection: Send + Sync {
    /// Lightweight liveness check.
    async fn ping(&self) -> CacheResult<()>;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Plain write. Clears any expiry previously set on the key.
    async fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Releases the connection. Default is to rely on drop.
    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Creates a new low-level client and opens a connection with it.
#[async_trait]
pub trait CacheConnector: Send + Sync {
    async fn connect(&self) -> CacheResult<Arc<dyn CacheConnection>>;

    /// Human readable target for logs. Must not contain credentials.
    fn describe(&self) -> String;
}
