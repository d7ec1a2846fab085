//! API Module
//!
//! HTTP adapter for the dispatcher. The URL path is decomposed into named
//! segments, the query string is parsed, and headers and body are passed
//! through untouched.

pub mod handlers;
pub mod routes;

pub use handlers::{dispatch_handler, path_segments, AppState};
pub use routes::create_router;
