//! Response DTOs
//!
//! Defines the structure of outgoing response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, ConnectionPhase};

/// Response body for reading a cache entry (GET /entries)
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: serde_json::Value,
}

impl EntryResponse {
    /// Creates a new EntryResponse
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for storing a cache entry (PUT /entries)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// TTL applied in seconds
    pub ttl: u64,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>, ttl: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            ttl,
        }
    }
}

/// Response body for deleting a cache entry (DELETE /entries)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for the health route (GET /)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" when the cache answers, "degraded" otherwise
    pub status: String,
    /// Result of the cache liveness check
    pub cache_connected: bool,
    /// Connection lifecycle phase of the cache client
    pub cache_phase: ConnectionPhase,
    /// Cache client counters
    pub cache_stats: CacheStats,
    /// Subject of the authenticated caller, if any
    pub subject: Option<u64>,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn new(
        cache_connected: bool,
        cache_phase: ConnectionPhase,
        cache_stats: CacheStats,
        subject: Option<u64>,
    ) -> Self {
        let status = if cache_connected { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            cache_connected,
            cache_phase,
            cache_stats,
            subject,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Short error label, e.g. "Not Found"
    pub error: String,
    /// Human readable description
    pub message: String,
    /// Extra context such as the offending parameter name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_response_serialize() {
        let resp = EntryResponse::new("test_key", serde_json::json!({"name": "Done"}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("test_key"));
        assert!(json.contains(r#""name":"Done""#));
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key", 60);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
        assert!(json.contains(r#""ttl":60"#));
    }

    #[test]
    fn test_delete_response_serialize() {
        let resp = DeleteResponse::new("deleted_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("deleted_key"));
        assert!(json.contains("deleted"));
    }

    #[test]
    fn test_health_response_degraded() {
        let resp = HealthResponse::new(
            false,
            ConnectionPhase::CoolingDown,
            CacheStats::default(),
            Some(42),
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""status":"degraded""#));
        assert!(json.contains(r#""cache_phase":"cooling_down""#));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_omits_empty_details() {
        let resp = ErrorResponse::new("Not Found", "Route not found");
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"error":"Not Found","message":"Route not found"}"#);
    }
}
