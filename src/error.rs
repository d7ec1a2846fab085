//! Error types for the dispatch core and cache client
//!
//! Provides unified error handling using thiserror.

use axum::http::{header::ALLOW, HeaderValue, StatusCode};
use thiserror::Error;

use crate::dispatch::Response;
use crate::models::ErrorResponse;

// == Api Error Enum ==
/// Errors that end a request. Every variant renders into a response envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No `Authorization` header on a protected function
    #[error("No token provided")]
    MissingToken,

    /// Credential present but rejected by the token validator
    #[error("Invalid token")]
    InvalidToken,

    /// Logical route has no entry in the route table
    #[error("Route not found")]
    RouteNotFound,

    /// Lookup of an entity came back empty
    #[error("{0}")]
    NotFound(String),

    /// Route exists but has no operation for the effective method
    #[error("Method {method} not allowed")]
    MethodNotAllowed { method: String, allowed: Vec<String> },

    /// Malformed input detected by an operation
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    /// Request body over the transport's size limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Uncaught failure while classifying or invoking
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for a bad request without details.
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::RouteNotFound | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label written to the `error` field of the body.
    pub fn label(&self) -> &'static str {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken => "Unauthorized",
            ApiError::RouteNotFound | ApiError::NotFound(_) => "Not Found",
            ApiError::MethodNotAllowed { .. } => "Method Not Allowed",
            ApiError::BadRequest { .. } => "Bad Request",
            ApiError::PayloadTooLarge(_) => "Payload Too Large",
            ApiError::Internal(_) => "Internal Server Error",
        }
    }

    /// Renders the error as a JSON response envelope.
    pub fn into_response(self) -> Response {
        let details = match &self {
            ApiError::BadRequest { details, .. } => details.clone(),
            _ => None,
        };
        let body = ErrorResponse::new(self.label(), self.to_string()).with_details(details);
        let mut response = Response::json(self.status(), &body);

        if let ApiError::MethodNotAllowed { allowed, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                response.headers.insert(ALLOW, value);
            }
        }

        response
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        err.into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for operations and the dispatcher.
pub type Result<T> = std::result::Result<T, ApiError>;

// == Cache Error Enum ==
/// Failures of the cache client and its backends.
///
/// Only `Serialization` and `Deserialization` ever leave the public client
/// API. Connection and backend errors are absorbed by the reconnection logic.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to serialize value for cache: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Failed to deserialize value from cache: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Cache command failed: {0}")]
    Backend(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

// == Token Error Enum ==
/// Failures of bearer token handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Empty, malformed, wrongly signed or expired credential
    #[error("Invalid token")]
    InvalidToken,

    #[error("Failed to issue token: {0}")]
    Issue(String),
}
