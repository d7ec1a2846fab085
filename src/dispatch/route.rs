//! Route Table
//!
//! Maps a logical route to its per-method operations. Built once when a
//! function starts, read-only afterwards, and shared without locking.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use super::{Request, Response};
use crate::error::Result;

// == Operation ==
/// A method handler registered on a route.
///
/// Implemented for every `Fn(Request) -> impl Future<Output = Result<Response>>`,
/// so plain `async fn`s and closures capturing shared state both qualify.
pub trait Operation: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture<'static, Result<Response>>;
}

impl<F, Fut> Operation for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Result<Response>> {
        (self)(req).boxed()
    }
}

/// Shared, type-erased operation.
pub type BoxedOperation = Arc<dyn Operation>;

// == Route ==
/// Operations of one logical route, keyed by upper-case method name.
#[derive(Clone, Default)]
pub struct Route {
    methods: HashMap<String, BoxedOperation>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `operation` for `method`. Method names are case-insensitive;
    /// registering the same method again replaces the earlier operation.
    pub fn on(mut self, method: &str, operation: impl Operation) -> Self {
        self.methods
            .insert(method.to_ascii_uppercase(), Arc::new(operation));
        self
    }

    /// Operation for `method`, if registered.
    pub fn operation(&self, method: &str) -> Option<&BoxedOperation> {
        self.methods.get(&method.to_ascii_uppercase())
    }

    pub fn supports(&self, method: &str) -> bool {
        self.operation(method).is_some()
    }

    /// Registered methods, sorted.
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.methods.keys().cloned().collect();
        methods.sort();
        methods
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods())
            .finish()
    }
}

// == Route Table ==
/// Logical route to [`Route`], matched by exact string only.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the route registered under `path`.
    pub fn route(mut self, path: impl Into<String>, route: Route) -> Self {
        self.routes.insert(path.into(), route);
        self
    }

    pub fn get(&self, path: &str) -> Option<&Route> {
        self.routes.get(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
