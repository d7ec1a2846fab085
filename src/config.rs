//! Configuration Module
//!
//! Handles loading function configuration from environment variables and
//! mounted secret files.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tokio::time::Duration;
use tracing::{debug, warn};

use crate::cache::{RedisConnector, RetryPolicy, DEFAULT_REDIS_PORT};

/// Where the platform mounts function secrets.
pub const DEFAULT_SECRETS_DIR: &str = "/var/openfaas/secrets";

const REDIS_PASSWORD_SECRET: &str = "redis-password";
const JWT_SECRET_SECRET: &str = "jwt-secret";

/// Function configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Secrets may come from the environment or from files under `secrets_dir`.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Redis host; `None` selects the in-memory backend
    pub redis_host: Option<String>,
    pub redis_port: u16,
    pub redis_password: Option<String>,
    /// HMAC key for bearer tokens
    pub jwt_secret: Option<String>,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Reconnect attempts per cool-down window
    pub cache_max_retries: u32,
    /// Cool-down in seconds after the retries are used up
    pub cache_retry_cooldown: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    pub secrets_dir: PathBuf,
    /// Skip bearer authentication for every route
    pub public_api: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_port", &self.server_port)
            .field("redis_host", &self.redis_host)
            .field("redis_port", &self.redis_port)
            .field("redis_password", &self.redis_password.as_ref().map(|_| "***"))
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "***"))
            .field("default_ttl", &self.default_ttl)
            .field("cache_max_retries", &self.cache_max_retries)
            .field("cache_retry_cooldown", &self.cache_retry_cooldown)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("secrets_dir", &self.secrets_dir)
            .field("public_api", &self.public_api)
            .finish()
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `REDIS_HOST` - Redis host (default: unset, in-memory cache)
    /// - `REDIS_PORT` - Redis port (default: 6379)
    /// - `REDIS_PASSWORD` - Redis password (fallback: `redis-password` secret)
    /// - `JWT_SECRET` - token signing key (fallback: `jwt-secret` secret)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_MAX_RETRIES` - Reconnect attempts per window (default: 3)
    /// - `CACHE_RETRY_COOLDOWN` - Cool-down in seconds (default: 600)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `SECRETS_DIR` - Secret mount (default: /var/openfaas/secrets)
    /// - `PUBLIC_API` - `true` disables bearer auth (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let secrets_dir = lookup("SECRETS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.secrets_dir);
        let secret = |key: &str, file: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .or_else(|| read_secret(&secrets_dir, file))
        };

        Self {
            server_port: parse_or(&lookup, "SERVER_PORT", defaults.server_port),
            redis_host: lookup("REDIS_HOST").filter(|h| !h.trim().is_empty()),
            redis_port: parse_or(&lookup, "REDIS_PORT", defaults.redis_port),
            redis_password: secret("REDIS_PASSWORD", REDIS_PASSWORD_SECRET),
            jwt_secret: secret("JWT_SECRET", JWT_SECRET_SECRET),
            default_ttl: parse_or(&lookup, "DEFAULT_TTL", defaults.default_ttl),
            cache_max_retries: parse_or(&lookup, "CACHE_MAX_RETRIES", defaults.cache_max_retries),
            cache_retry_cooldown: parse_or(&lookup, "CACHE_RETRY_COOLDOWN", defaults.cache_retry_cooldown),
            cleanup_interval: parse_or(&lookup, "CLEANUP_INTERVAL", defaults.cleanup_interval),
            public_api: lookup("PUBLIC_API")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(defaults.public_api),
            secrets_dir,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.cache_max_retries,
            Duration::from_secs(self.cache_retry_cooldown),
        )
    }

    /// Redis connector for the configured host, if any.
    pub fn redis_connector(&self) -> Option<RedisConnector> {
        self.redis_host.as_deref().map(|host| {
            RedisConnector::from_parts(host, self.redis_port, self.redis_password.as_deref())
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            redis_host: None,
            redis_port: DEFAULT_REDIS_PORT,
            redis_password: None,
            jwt_secret: None,
            default_ttl: 300,
            cache_max_retries: 3,
            cache_retry_cooldown: 600,
            cleanup_interval: 1,
            secrets_dir: PathBuf::from(DEFAULT_SECRETS_DIR),
            public_api: false,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Reads a mounted secret, trimmed. Missing or unreadable files yield `None`.
pub fn read_secret(dir: &Path, name: &str) -> Option<String> {
    let path = dir.join(name);
    match fs::read_to_string(&path) {
        Ok(contents) => {
            let value = contents.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Secret not mounted");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read secret");
            None
        }
    }
}
