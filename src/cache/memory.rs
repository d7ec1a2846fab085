//! In-Memory Backend
//!
//! HashMap storage with per-key expiry, exposed through the connector seam.
//! Used when no Redis host is configured and as the test double for outage
//! scenarios (availability switch plus a connect-attempt counter).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::backend::{CacheConnection, CacheConnector};
use crate::cache::CacheEntry;
use crate::error::{CacheError, CacheResult};

/// Store shared between the connector, its connections and the cleanup task.
pub type SharedStore = Arc<RwLock<MemoryStore>>;

// == Memory Store ==
/// Key/value storage with TTL expiration.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store ready to be shared.
    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    // == Set ==
    /// Stores a value. Overwrites the key and drops any previous expiry.
    pub fn set(&mut self, key: String, value: String) {
        self.entries.insert(key, CacheEntry::new(value));
    }

    // == Get ==
    /// Returns the value if present and not expired. Expired entries are removed.
    pub fn get(&mut self, key: &str) -> Option<String> {
        if self.entries.get(key)?.is_expired() {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Expire ==
    /// Sets a TTL on an existing key. Returns false if the key is absent.
    pub fn expire(&mut self, key: &str, ttl_seconds: u64) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.expire_in(ttl_seconds);
                true
            }
            _ => false,
        }
    }

    // == Delete ==
    /// Removes a key. Returns true if something live was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    pub fn exists(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }

    /// Number of stored entries, expired ones included until cleaned up.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Memory Connector ==
/// Connector over a [`SharedStore`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: SharedStore,
    available: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::shared())
    }

    pub fn with_store(store: SharedStore) -> Self {
        Self {
            store,
            available: Arc::new(AtomicBool::new(true)),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Simulates the backing service going away or coming back. Open
    /// connections fail every command while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `connect` calls made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheConnector for MemoryConnector {
    async fn connect(&self) -> CacheResult<Arc<dyn CacheConnection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(CacheError::Connection(
                "memory backend unavailable".to_string(),
            ));
        }

        Ok(Arc::new(MemoryConnection {
            store: self.store.clone(),
            available: self.available.clone(),
        }))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

struct MemoryConnection {
    store: SharedStore,
    available: Arc<AtomicBool>,
}

impl MemoryConnection {
    fn check(&self) -> CacheResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Backend("connection reset".to_string()))
        }
    }
}

#[async_trait]
impl CacheConnection for MemoryConnection {
    async fn ping(&self) -> CacheResult<()> {
        self.check()
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check()?;
        Ok(self.store.write().await.get(key))
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.check()?;
        self.store
            .write()
            .await
            .set(key.to_string(), value.to_string());
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<()> {
        self.check()?;
        self.store.write().await.expire(key, ttl_seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check()?;
        self.store.write().await.delete(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.check()?;
        Ok(self.store.write().await.exists(key))
    }
}
