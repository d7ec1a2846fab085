//! taskfn - shared runtime for task-manager function handlers
//!
//! Provides the request dispatch core (bearer authentication, route
//! classification, method dispatch, uniform error envelopes) and a
//! best-effort cache client that reconnects on its own.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod ops;
pub mod tasks;

pub use api::AppState;
pub use auth::{AuthContext, TokenValidator};
pub use cache::ResilientCacheClient;
pub use config::Config;
pub use dispatch::{AuthMode, Dispatcher, Request, Response, Route, RouteTable};
pub use tasks::spawn_cleanup_task;
