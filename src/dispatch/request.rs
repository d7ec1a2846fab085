//! Inbound Request
//!
//! The request shape handed to the dispatcher by the hosting runtime.

use std::collections::HashMap;
use std::str::FromStr;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use tracing::debug;

use crate::auth::AuthContext;
use crate::error::{ApiError, Result};

/// Named path segments, as exposed by the hosting platform's router.
pub type PathSegments = HashMap<String, String>;

/// Header that replaces the transport method for route lookup.
pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";

// == Request ==
/// An inbound request.
///
/// Header lookups are case-insensitive. `auth` is filled in by the
/// dispatcher once the bearer credential has been verified.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Transport method, `GET` when none was determinable
    pub method: Method,
    /// Path decomposed into named segments
    pub path: PathSegments,
    /// Query string parameters
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    /// Raw body, typically JSON for non-GET methods
    pub body: String,
    /// Verified caller identity
    pub auth: Option<AuthContext>,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn with_segment(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Adds a header. Names or values that are not valid HTTP are dropped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => debug!(header = name, "Ignoring invalid header"),
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// The method used for route lookup: the override header when present,
    /// otherwise the transport method. Always upper-case.
    pub fn effective_method(&self) -> String {
        self.headers
            .get(METHOD_OVERRIDE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.method.as_str())
            .to_ascii_uppercase()
    }

    /// Subject of the authenticated caller.
    pub fn subject(&self) -> Option<u64> {
        self.auth.map(|ctx| ctx.subject)
    }

    /// Parses a required query parameter.
    ///
    /// A missing parameter or one that does not parse as `T` yields a
    /// `BadRequest` which renders as a 400 envelope.
    pub fn query_param<T: FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.query.get(key).ok_or_else(|| ApiError::BadRequest {
            message: "Missing required parameter".to_string(),
            details: Some(key.to_string()),
        })?;

        raw.trim()
            .parse()
            .map_err(|_| ApiError::bad_request(format!("Invalid format for {key}")))
    }

    /// Deserializes the JSON body into `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))
    }
}
