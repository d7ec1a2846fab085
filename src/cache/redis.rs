//! Redis Backend
//!
//! Connector that builds a fresh `redis::Client` per connection attempt and
//! opens a multiplexed async connection with it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::debug;

use crate::cache::backend::{CacheConnection, CacheConnector};
use crate::error::{CacheError, CacheResult};

pub const DEFAULT_REDIS_PORT: u16 = 6379;

// == Redis Connector ==
#[derive(Clone)]
pub struct RedisConnector {
    url: String,
}

impl fmt::Debug for RedisConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConnector")
            .field("url", &redact_url(&self.url))
            .finish()
    }
}

impl RedisConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Builds `redis://[:password@]host:port`. An empty password counts as
    /// none.
    pub fn from_parts(host: &str, port: u16, password: Option<&str>) -> Self {
        let url = match password.filter(|p| !p.is_empty()) {
            Some(password) => format!("redis://:{password}@{host}:{port}"),
            None => format!("redis://{host}:{port}"),
        };
        Self::new(url)
    }
}

#[async_trait]
impl CacheConnector for RedisConnector {
    async fn connect(&self) -> CacheResult<Arc<dyn CacheConnection>> {
        let client = redis::Client::open(self.url.as_str()).map_err(|e| {
            CacheError::Connection(format!("Failed to create Redis client: {e}"))
        })?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {e}")))?;

        debug!(url = %redact_url(&self.url), "Redis connection opened");
        Ok(Arc::new(RedisConnection { conn }))
    }

    fn describe(&self) -> String {
        redact_url(&self.url)
    }
}

// == Redis Connection ==
struct RedisConnection {
    conn: MultiplexedConnection,
}

fn backend_error(command: &str, e: redis::RedisError) -> CacheError {
    CacheError::Backend(format!("Redis {command} failed: {e}"))
}

#[async_trait]
impl CacheConnection for RedisConnection {
    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| backend_error("PING", e))?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Backend(format!("unexpected PING reply: {pong}")))
        }
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| backend_error("GET", e))
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| backend_error("SET", e))
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let seconds = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        conn.expire::<_, ()>(key, seconds)
            .await
            .map_err(|e| backend_error("EXPIRE", e))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| backend_error("DEL", e))
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(key)
            .await
            .map_err(|e| backend_error("EXISTS", e))
    }
}

/// Masks the password: `redis://:secret@host` becomes `redis://:***@host`.
fn redact_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            return format!("{}***{}", &url[..=colon_pos], &url[at_pos..]);
        }
    }
    url.to_string()
}
