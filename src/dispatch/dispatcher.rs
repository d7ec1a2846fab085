//! Dispatcher
//!
//! Runs one request through authentication, route classification, method
//! lookup and invocation, and always hands back exactly one envelope.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use futures::FutureExt;
use tracing::{debug, info, warn};

use super::{Classifier, PathSegments, Request, Response, RouteTable};
use crate::auth::{AuthContext, TokenValidator, BEARER_PREFIX_LEN};
use crate::error::{ApiError, Result};

/// Longest body prefix written to the per-request diagnostic record.
const LOGGED_BODY_CHARS: usize = 256;

/// How a dispatcher authenticates callers.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Every request is let through without a credential.
    Public,
    /// Every request must carry a bearer token accepted by the validator.
    Bearer(Arc<TokenValidator>),
}

// == Dispatcher ==
/// Composition of a route table, a classifier and an auth mode.
pub struct Dispatcher {
    routes: RouteTable,
    classifier: Box<dyn Classifier>,
    auth: AuthMode,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(routes: RouteTable, classifier: impl Classifier, auth: AuthMode) -> Self {
        Self {
            routes,
            classifier: Box::new(classifier),
            auth,
        }
    }

    /// Handles one request. Never fails: every outcome, including a panicking
    /// operation, becomes a response with `Content-Type: application/json`.
    pub async fn dispatch(&self, req: Request) -> Response {
        let result = self.resolve(req).await;
        self.finish(result)
    }

    /// Answers a request the transport could not fully read, such as an
    /// oversized body. Authentication still runs first, so a caller without
    /// a valid credential gets 401 rather than the read failure.
    pub fn reject(&self, headers: &HeaderMap, err: ApiError) -> Response {
        let err = match &self.auth {
            AuthMode::Bearer(validator) => authenticate(validator, headers).err().unwrap_or(err),
            AuthMode::Public => err,
        };
        self.finish(Err(err))
    }

    fn finish(&self, result: Result<Response>) -> Response {
        let mut response = match result {
            Ok(response) => response,
            Err(err) => {
                if err.status().is_server_error() {
                    warn!(error = %err, "Request failed");
                } else {
                    debug!(status = %err.status(), error = %err, "Request rejected");
                }
                err.into_response()
            }
        };
        response.force_json_content_type();
        response
    }

    async fn resolve(&self, mut req: Request) -> Result<Response> {
        let method = req.effective_method();

        if let AuthMode::Bearer(validator) = &self.auth {
            req.auth = Some(authenticate(validator, &req.headers)?);
        }

        let route = self.classify(&req.path)?;
        info!(
            route = %route,
            method = %method,
            body = truncate_body(&req.body),
            "Received request"
        );

        let entry = self.routes.get(&route).ok_or(ApiError::RouteNotFound)?;
        let operation = entry
            .operation(&method)
            .ok_or_else(|| ApiError::MethodNotAllowed {
                method: method.clone(),
                allowed: entry.methods(),
            })?;

        AssertUnwindSafe(async move { operation.call(req).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ApiError::Internal(panic_message(panic.as_ref()))))
    }

    fn classify(&self, segments: &PathSegments) -> Result<String> {
        catch_unwind(AssertUnwindSafe(|| self.classifier.classify(segments)))
            .map_err(|panic| ApiError::Internal(panic_message(panic.as_ref())))
    }
}

/// Extracts and verifies the bearer credential.
///
/// The first seven characters of the header are dropped unconditionally, so
/// callers must send the literal `Bearer ` prefix.
fn authenticate(validator: &TokenValidator, headers: &HeaderMap) -> Result<AuthContext> {
    let header = headers.get(AUTHORIZATION).ok_or(ApiError::MissingToken)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.get(BEARER_PREFIX_LEN..))
        .unwrap_or_default();

    validator.authenticate(token).map_err(|_| ApiError::InvalidToken)
}

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(LOGGED_BODY_CHARS) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Operation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{PriorityClassifier, Route, JSON_CONTENT_TYPE};
    use axum::http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode};

    const SECRET: &[u8] = b"dispatcher-test-secret";

    async fn created(req: Request) -> Result<Response> {
        let subject = req.subject().unwrap_or_default();
        Ok(
            Response::json(StatusCode::CREATED, &serde_json::json!({ "owner": subject }))
                .with_header(CONTENT_TYPE, HeaderValue::from_static("text/html")),
        )
    }

    async fn deleted(_req: Request) -> Result<Response> {
        Ok(Response::ok(&serde_json::json!({ "deleted": true })))
    }

    async fn failing(_req: Request) -> Result<Response> {
        Err(anyhow::anyhow!("project store unavailable").into())
    }

    async fn panicking(_req: Request) -> Result<Response> {
        panic!("status order overflow")
    }

    fn table() -> RouteTable {
        RouteTable::new()
            .route("/", Route::new().on("POST", created).on("PUT", failing))
            .route("/tag", Route::new().on("DELETE", deleted).on("PUT", panicking))
    }

    fn validator() -> Arc<TokenValidator> {
        Arc::new(TokenValidator::new(SECRET))
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            table(),
            PriorityClassifier::new(["tag"]),
            AuthMode::Bearer(validator()),
        )
    }

    fn bearer(subject: u64) -> String {
        let token = validator()
            .issue(subject, chrono::Duration::hours(1))
            .unwrap();
        format!("Bearer {token}")
    }

    fn body_json(response: &Response) -> serde_json::Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_missing_token() {
        let response = dispatcher().dispatch(Request::new(Method::POST)).await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(&response)["message"], "No token provided");
        assert_eq!(response.headers.get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_wrongly_signed_token() {
        let foreign = TokenValidator::new(b"someone-else")
            .issue(42, chrono::Duration::hours(1))
            .unwrap();
        let req = Request::new(Method::POST)
            .with_header("Authorization", &format!("Bearer {foreign}"));

        let response = dispatcher().dispatch(req).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(&response)["message"], "Invalid token");
    }

    #[tokio::test]
    async fn test_short_authorization_header_is_invalid() {
        let req = Request::new(Method::POST).with_header("Authorization", "Bear");

        let response = dispatcher().dispatch(req).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(&response)["message"], "Invalid token");
    }

    #[tokio::test]
    async fn test_created_passes_through_with_forced_content_type() {
        let req = Request::new(Method::POST)
            .with_header("Authorization", &bearer(42))
            .with_body(r#"{"name":"Launch"}"#);

        let response = dispatcher().dispatch(req).await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(body_json(&response)["owner"], 42);
        assert_eq!(response.headers.get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let dispatcher = Dispatcher::new(
            table(),
            |_: &PathSegments| "/status".to_string(),
            AuthMode::Bearer(validator()),
        );
        let req = Request::new(Method::GET).with_header("Authorization", &bearer(1));

        let response = dispatcher.dispatch(req).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.contains(r#""error":"Not Found""#));
        assert_eq!(body_json(&response)["message"], "Route not found");
    }

    #[tokio::test]
    async fn test_method_override_wins_over_transport() {
        let req = Request::new(Method::POST)
            .with_segment("tag", "3")
            .with_header("Authorization", &bearer(7))
            .with_header("X-Http-Method-Override", "DELETE");

        let response = dispatcher().dispatch(req).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_without_override_method_not_allowed() {
        let req = Request::new(Method::POST)
            .with_segment("tag", "3")
            .with_header("Authorization", &bearer(7));

        let response = dispatcher().dispatch(req).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers.get("allow").unwrap(), "DELETE, PUT");
    }

    #[tokio::test]
    async fn test_auth_runs_before_method_check() {
        let req = Request::new(Method::GET).with_segment("tag", "3");

        let response = dispatcher().dispatch(req).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_operation_error_becomes_internal_error() {
        let req = Request::new(Method::PUT).with_header("Authorization", &bearer(7));

        let response = dispatcher().dispatch(req).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&response)["message"], "project store unavailable");
    }

    #[tokio::test]
    async fn test_operation_panic_becomes_internal_error() {
        let req = Request::new(Method::PUT)
            .with_segment("tag", "")
            .with_header("Authorization", &bearer(7));

        let response = dispatcher().dispatch(req).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&response)["message"], "status order overflow");
    }

    #[tokio::test]
    async fn test_classifier_panic_becomes_internal_error() {
        let dispatcher = Dispatcher::new(
            table(),
            |_: &PathSegments| -> String { panic!("segment table corrupted") },
            AuthMode::Public,
        );

        let response = dispatcher.dispatch(Request::default()).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&response)["message"], "segment table corrupted");
    }

    #[tokio::test]
    async fn test_public_dispatcher_skips_auth() {
        let dispatcher = Dispatcher::new(table(), PriorityClassifier::root(), AuthMode::Public);

        let response = dispatcher.dispatch(Request::new(Method::POST)).await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(body_json(&response)["owner"], 0);
    }

    #[test]
    fn test_reject_authenticates_before_reporting_read_failure() {
        let dispatcher = dispatcher();
        let too_large = || ApiError::PayloadTooLarge("length limit exceeded".to_string());

        let anonymous = dispatcher.reject(&HeaderMap::new(), too_large());
        assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer(42)).unwrap());
        let response = dispatcher.reject(&headers, too_large());
        assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers.get(CONTENT_TYPE).unwrap(),
            JSON_CONTENT_TYPE
        );
        assert_eq!(body_json(&response)["error"], "Payload Too Large");
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(LOGGED_BODY_CHARS + 10);
        assert_eq!(truncate_body(&body).chars().count(), LOGGED_BODY_CHARS);
        assert_eq!(truncate_body("short"), "short");
    }
}
