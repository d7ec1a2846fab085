//! Dispatch Module
//!
//! The shared front of every function: bearer authentication, route
//! classification, method dispatch (honouring `X-Http-Method-Override`) and
//! uniform JSON error envelopes.
//!
//! # Flow
//! `Request` -> auth -> classify -> route table -> method -> operation -> `Response`

mod classify;
mod dispatcher;
mod request;
mod response;
mod route;


pub use classify::{Classifier, PriorityClassifier, ROOT_ROUTE};
pub use dispatcher::{AuthMode, Dispatcher};
pub use request::{PathSegments, Request, METHOD_OVERRIDE_HEADER};
pub use response::{Response, JSON_CONTENT_TYPE};
pub use route::{BoxedOperation, Operation, Route, RouteTable};
