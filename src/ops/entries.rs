//! Entry Operations
//!
//! Read, write and delete cache entries addressed by `?key=`. Keys are
//! namespaced per caller so one tenant never sees another's entries.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::cache::ResilientCacheClient;
use crate::dispatch::{Request, Response};
use crate::error::{ApiError, Result};
use crate::models::{validate_key, DeleteResponse, EntryResponse, PutEntryRequest, SetResponse};

/// Cache key for `key` as seen by the caller of `req`.
pub fn scoped_key(req: &Request, key: &str) -> String {
    match req.subject() {
        Some(subject) => format!("user:{subject}:{key}"),
        None => format!("public:{key}"),
    }
}

fn requested_key(req: &Request) -> Result<String> {
    let key: String = req.query_param("key")?;
    if let Some(message) = validate_key(&key) {
        return Err(ApiError::BadRequest {
            message,
            details: Some("key".to_string()),
        });
    }
    Ok(key)
}

// == GET /entries ==
pub async fn get_entry(cache: Arc<ResilientCacheClient>, req: Request) -> Result<Response> {
    let key = requested_key(&req)?;

    match cache.get::<Value>(&scoped_key(&req, &key)).await? {
        Some(value) => Ok(Response::ok(&EntryResponse::new(key, value))),
        None => Err(ApiError::NotFound(format!("Key '{key}' not found"))),
    }
}

// == PUT /entries ==
pub async fn put_entry(cache: Arc<ResilientCacheClient>, req: Request) -> Result<Response> {
    let key = requested_key(&req)?;
    let body: PutEntryRequest = req.json()?;
    let ttl = body.ttl.unwrap_or_else(|| cache.default_ttl());

    cache.set(&scoped_key(&req, &key), &body.value, ttl).await?;
    debug!(key = %key, ttl, "Entry stored");

    Ok(Response::ok(&SetResponse::new(key, ttl)))
}

// == DELETE /entries ==
pub async fn delete_entry(cache: Arc<ResilientCacheClient>, req: Request) -> Result<Response> {
    let key = requested_key(&req)?;
    let scoped = scoped_key(&req, &key);

    if !cache.exists(&scoped).await {
        return Err(ApiError::NotFound(format!("Key '{key}' not found")));
    }
    cache.delete(&scoped).await;

    Ok(Response::ok(&DeleteResponse::new(key)))
}
