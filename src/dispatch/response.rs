//! Response Envelope
//!
//! The uniform (status, headers, body) result produced for every request.

use axum::http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use tracing::warn;

/// Content type forced onto every dispatched response.
pub const JSON_CONTENT_TYPE: &str = "application/json";

const SERIALIZATION_FAILURE_BODY: &str =
    r#"{"error":"Internal Server Error","message":"Failed to serialize response"}"#;

// == Response ==
/// Outbound response envelope.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    /// Creates an envelope with an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    /// Creates an envelope whose body is `payload` serialized as JSON.
    ///
    /// A payload that fails to serialize turns the envelope into a 500 with
    /// a fixed error body rather than an empty one.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => Self::new(status).with_body(body),
            Err(e) => {
                warn!(error = %e, "JSON serialization failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_body(SERIALIZATION_FAILURE_BODY)
            }
        }
    }

    /// `200 OK` with a JSON body.
    pub fn ok<T: Serialize + ?Sized>(payload: &T) -> Self {
        Self::json(StatusCode::OK, payload)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Overwrites whatever `Content-Type` the producer set.
    pub(crate) fn force_json_content_type(&mut self) {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    }
}

impl axum::response::IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.headers, self.body).into_response()
    }
}
