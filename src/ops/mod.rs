//! Cache Admin Function
//!
//! The function served by the binary: a health route and tenant-scoped
//! cache entries, all behind the shared dispatcher.
//!
//! # Routes
//! - `GET /` - Health and cache client state
//! - `GET /entries?key=` - Read an entry
//! - `PUT /entries?key=` - Store `{"value": .., "ttl": ..}`
//! - `DELETE /entries?key=` - Remove an entry

mod entries;
mod health;

use std::future::Future;
use std::sync::Arc;

pub use entries::{delete_entry, get_entry, put_entry, scoped_key};
pub use health::health;

use crate::cache::ResilientCacheClient;
use crate::dispatch::{PriorityClassifier, Request, Response, Route, RouteTable, ROOT_ROUTE};
use crate::error::Result;

/// Logical route of the entry operations.
pub const ENTRIES_ROUTE: &str = "/entries";

/// Binds an operation to a shared cache client.
fn with_cache<F, Fut>(
    cache: &Arc<ResilientCacheClient>,
    op: F,
) -> impl Fn(Request) -> Fut + Send + Sync + 'static
where
    F: Fn(Arc<ResilientCacheClient>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    let cache = cache.clone();
    move |req: Request| op(cache.clone(), req)
}

pub fn routes(cache: Arc<ResilientCacheClient>) -> RouteTable {
    RouteTable::new()
        .route(ROOT_ROUTE, Route::new().on("GET", with_cache(&cache, health)))
        .route(
            ENTRIES_ROUTE,
            Route::new()
                .on("GET", with_cache(&cache, get_entry))
                .on("PUT", with_cache(&cache, put_entry))
                .on("DELETE", with_cache(&cache, delete_entry)),
        )
}

pub fn classifier() -> PriorityClassifier {
    PriorityClassifier::new(["entries"])
}
