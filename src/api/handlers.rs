//! API Handlers
//!
//! Bridges axum requests into the dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderMap, Method, StatusCode, Uri},
};

use crate::dispatch::{Dispatcher, PathSegments, Request, Response};
use crate::error::ApiError;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Splits a URL path into named segments: every segment becomes a key whose
/// value is the segment after it, or empty for the last one.
///
/// `/projects/42/users` gives `projects=42`, `42=users`, `users=`.
pub fn path_segments(path: &str) -> PathSegments {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut segments = PathSegments::new();

    for (i, part) in parts.iter().enumerate() {
        let value = parts.get(i + 1).copied().unwrap_or_default();
        segments
            .entry((*part).to_string())
            .or_insert_with(|| value.to_string());
    }
    segments
}

/// Catch-all handler: every method on every path goes through the dispatcher.
///
/// Query and body rejections are answered by the dispatcher too, so they
/// come back as JSON envelopes like any other failure.
pub async fn dispatch_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            let err = ApiError::BadRequest {
                message: "Invalid query string".to_string(),
                details: Some(rejection.body_text()),
            };
            return state.dispatcher.reject(&headers, err);
        }
    };
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return state.dispatcher.reject(&headers, body_error(rejection)),
    };

    let req = Request {
        method,
        path: path_segments(uri.path()),
        query,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
        auth: None,
    };

    state.dispatcher.dispatch(req).await
}

fn body_error(rejection: BytesRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(rejection.body_text())
    } else {
        ApiError::bad_request(rejection.body_text())
    }
}
