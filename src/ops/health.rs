//! Health Operation

use std::sync::Arc;

use crate::cache::ResilientCacheClient;
use crate::dispatch::{Request, Response};
use crate::error::Result;
use crate::models::HealthResponse;

/// Always 200; a cache outage shows up as `"status": "degraded"`.
pub async fn health(cache: Arc<ResilientCacheClient>, req: Request) -> Result<Response> {
    let response = HealthResponse::new(
        cache.ensure_connected().await,
        cache.phase().await,
        cache.stats(),
        req.subject(),
    );
    Ok(Response::ok(&response))
}
