//! Resilient Cache Client
//!
//! Best-effort key/value cache with self-healing reconnection. Connectivity
//! failures never surface to callers: reads during an outage look like
//! misses and writes are dropped. Only encoding problems are reported.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::backend::{CacheConnection, CacheConnector};
use crate::cache::state::{Attempt, ConnectionPhase, ConnectionState, RetryPolicy};
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::error::{CacheError, CacheResult};

/// TTL applied by [`ResilientCacheClient::set_default`], in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 300;

type SharedConnection = Arc<dyn CacheConnection>;

// == Resilient Cache Client ==
/// Cache client that owns its connection lifecycle.
///
/// Healthy-path operations only take a shared read lock on the connection
/// handle. Reconnecting is serialized by `state`, which also guards the retry
/// counter and last-attempt time. Lock order is always `state` before
/// `connection`.
pub struct ResilientCacheClient {
    connector: Box<dyn CacheConnector>,
    connection: RwLock<Option<SharedConnection>>,
    state: Mutex<ConnectionState>,
    default_ttl: u64,
    closed: AtomicBool,
    stats: StatsRecorder,
}

impl fmt::Debug for ResilientCacheClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientCacheClient")
            .field("target", &self.connector.describe())
            .field("default_ttl", &self.default_ttl)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ResilientCacheClient {
    // == Constructors ==
    /// Creates a client without touching the network. The first operation
    /// connects.
    pub fn new(connector: impl CacheConnector + 'static, policy: RetryPolicy) -> Self {
        Self {
            connector: Box::new(connector),
            connection: RwLock::new(None),
            state: Mutex::new(ConnectionState::new(policy)),
            default_ttl: DEFAULT_TTL_SECONDS,
            closed: AtomicBool::new(false),
            stats: StatsRecorder::default(),
        }
    }

    /// Creates a client and makes the initial connection attempt.
    ///
    /// An unreachable backend does not fail construction; the client simply
    /// starts out degraded.
    pub async fn connect(connector: impl CacheConnector + 'static, policy: RetryPolicy) -> Self {
        let client = Self::new(connector, policy);
        if client.ensure_connection().await.is_none() {
            warn!(target = %client.connector.describe(), "Cache unavailable at startup");
        }
        client
    }

    /// Overrides the TTL used by [`set_default`](Self::set_default).
    pub fn with_default_ttl(mut self, ttl_seconds: u64) -> Self {
        self.default_ttl = ttl_seconds;
        self
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    // == Set ==
    /// Stores `value` as JSON under `key`, then applies `ttl_seconds` if it
    /// is positive.
    ///
    /// The expiry is a second command, so a failure between the two leaves
    /// the key without TTL. Write failures are logged and not retried here;
    /// the next operation triggers reconnection.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> CacheResult<()> {
        let payload = serde_json::to_string(value).map_err(CacheError::Serialization)?;

        let Some(conn) = self.ensure_connection().await else {
            debug!(key, "Cache unavailable, dropping SET");
            return Ok(());
        };

        if let Err(e) = conn.set(key, &payload).await {
            warn!(key, error = %e, "Cache SET failed");
            return Ok(());
        }

        if ttl_seconds > 0 {
            if let Err(e) = conn.expire(key, ttl_seconds).await {
                warn!(key, ttl_seconds, error = %e, "Cache EXPIRE failed");
            }
        }

        debug!(key, ttl_seconds, "Cache SET");
        Ok(())
    }

    /// [`set`](Self::set) with the client's default TTL.
    pub async fn set_default<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> CacheResult<()> {
        self.set(key, value, self.default_ttl).await
    }

    // == Get ==
    /// Reads and decodes `key`. Absent keys and outages both yield `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let payload = match self.ensure_connection().await {
            Some(conn) => match conn.get(key).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(key, error = %e, "Cache GET failed");
                    None
                }
            },
            None => None,
        };

        let Some(payload) = payload else {
            self.stats.record_miss();
            debug!(key, "Cache MISS");
            return Ok(None);
        };

        self.stats.record_hit();
        debug!(key, "Cache HIT");
        serde_json::from_str(&payload)
            .map(Some)
            .map_err(CacheError::Deserialization)
    }

    // == Delete ==
    /// Removes `key`. Missing keys and outages are ignored.
    pub async fn delete(&self, key: &str) {
        if let Some(conn) = self.ensure_connection().await {
            if let Err(e) = conn.delete(key).await {
                warn!(key, error = %e, "Cache DEL failed");
            }
        }
    }

    // == Exists ==
    /// Whether `key` is present. False during an outage.
    pub async fn exists(&self, key: &str) -> bool {
        match self.ensure_connection().await {
            Some(conn) => conn.exists(key).await.unwrap_or_else(|e| {
                warn!(key, error = %e, "Cache EXISTS failed");
                false
            }),
            None => false,
        }
    }

    // == Liveness ==
    /// Pings the current connection. Never reconnects, never fails.
    pub async fn is_connected(&self) -> bool {
        match self.current().await {
            Some(conn) => conn.ping().await.is_ok(),
            None => false,
        }
    }

    /// Like an operation would, reconnects if the policy allows, then
    /// reports whether a live connection is available.
    pub async fn ensure_connected(&self) -> bool {
        self.ensure_connection().await.is_some()
    }

    /// Connection phase as of now.
    pub async fn phase(&self) -> ConnectionPhase {
        self.state.lock().await.phase_at(Instant::now())
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Shutdown ==
    /// Releases the connection. Idempotent; release errors are swallowed.
    /// Afterwards every operation behaves as during an outage.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut state = self.state.lock().await;
        if let Some(conn) = self.connection.write().await.take() {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "Ignoring error while closing cache connection");
            }
        }
        state.reset();
        info!(target = %self.connector.describe(), "Cache client shut down");
    }

    // == Connection Management ==
    async fn current(&self) -> Option<SharedConnection> {
        self.connection.read().await.clone()
    }

    /// Returns a connection that answered a ping, reconnecting if needed.
    /// `None` means the cache is unavailable for this call.
    async fn ensure_connection(&self) -> Option<SharedConnection> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }

        if let Some(conn) = self.current().await {
            if conn.ping().await.is_ok() {
                return Some(conn);
            }
        }

        self.reinitialize().await
    }

    async fn reinitialize(&self) -> Option<SharedConnection> {
        let mut state = self.state.lock().await;

        if self.closed.load(Ordering::SeqCst) {
            return None;
        }

        // Another caller may have reconnected while we waited for the lock.
        if let Some(conn) = self.current().await {
            if conn.ping().await.is_ok() {
                return Some(conn);
            }
            state.record_lost();
        }

        // One call never makes more than a window's worth of attempts.
        for _ in 0..state.policy().max_retries() {
            if state.begin_attempt(Instant::now()) == Attempt::Skip {
                self.stats.record_skipped_reconnect();
                debug!("Skipping cache reconnect during cool-down");
                return self.current().await;
            }
            self.stats.record_reconnect_attempt();

            if let Some(stale) = self.connection.write().await.take() {
                if let Err(e) = stale.close().await {
                    debug!(error = %e, "Ignoring error while closing stale cache connection");
                }
            }

            match self.connector.connect().await {
                Ok(conn) => {
                    state.record_success();
                    *self.connection.write().await = Some(conn.clone());
                    info!(target = %self.connector.describe(), "Cache connection established");
                    return Some(conn);
                }
                Err(e) => {
                    state.record_failure();
                    warn!(
                        target = %self.connector.describe(),
                        attempt = state.retry_count(),
                        max_retries = state.policy().max_retries(),
                        error = %e,
                        "Cache connection attempt failed"
                    );
                }
            }
        }

        None
    }
}
