//! Integration Tests for the Dispatch Pipeline
//!
//! Drives full request/response cycles through the axum router: bearer
//! authentication, classification, method override, envelopes and the
//! cache admin routes.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderValue, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use taskfn::{
    api::{create_router, AppState},
    cache::{MemoryConnector, ResilientCacheClient, RetryPolicy},
    dispatch::{PriorityClassifier, Response},
    error::ApiError,
    ops, AuthMode, Dispatcher, Route, RouteTable, TokenValidator,
};
use tower::ServiceExt;

const SECRET: &[u8] = b"integration-secret";

// == Helper Functions ==

fn validator() -> Arc<TokenValidator> {
    Arc::new(TokenValidator::new(SECRET))
}

fn bearer(subject: u64) -> String {
    let token = validator()
        .issue(subject, chrono::Duration::minutes(5))
        .unwrap();
    format!("Bearer {token}")
}

/// A project-style function: `/` and `/tag` registered, `/status` classified
/// but not registered.
fn project_app() -> Router {
    let routes = RouteTable::new()
        .route(
            "/",
            Route::new().on("POST", |req: taskfn::Request| async move {
                let mut response = Response::json(
                    StatusCode::CREATED,
                    &json!({ "created_by": req.subject() }),
                );
                response
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                Ok::<_, ApiError>(response)
            }),
        )
        .route(
            "/tag",
            Route::new().on("DELETE", |_req: taskfn::Request| async {
                Ok::<_, ApiError>(Response::ok(&json!({ "deleted": true })))
            }),
        );

    let dispatcher = Dispatcher::new(
        routes,
        PriorityClassifier::projects(),
        AuthMode::Bearer(validator()),
    );
    create_router(AppState::new(dispatcher))
}

fn cache_admin_app() -> Router {
    let cache = Arc::new(ResilientCacheClient::new(
        MemoryConnector::new(),
        RetryPolicy::default(),
    ));
    let dispatcher = Dispatcher::new(
        ops::routes(cache),
        ops::classifier(),
        AuthMode::Bearer(validator()),
    );
    create_router(AppState::new(dispatcher))
}

async fn body_to_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// == Authentication ==

#[tokio::test]
async fn test_missing_token_is_401_no_token() {
    let response = project_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_to_json(response).await;
    assert_eq!(json["error"], "Unauthorized");
    assert_eq!(json["message"], "No token provided");
}

#[tokio::test]
async fn test_wrongly_signed_token_is_401_invalid_token() {
    let forged = TokenValidator::new(b"another-secret")
        .issue(42, chrono::Duration::minutes(5))
        .unwrap();

    let response = project_app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("authorization", format!("Bearer {forged}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_to_json(response).await["message"], "Invalid token");
}

// == Routing ==

#[tokio::test]
async fn test_unregistered_route_is_404() {
    let response = project_app()
        .oneshot(
            Request::builder()
                .uri("/status")
                .header("authorization", bearer(42))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(body.contains(r#""error":"Not Found""#));
    assert!(body.contains("Route not found"));
}

#[tokio::test]
async fn test_method_override_wins_over_transport_method() {
    let response = project_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tag")
                .header("authorization", bearer(42))
                .header("X-Http-Method-Override", "DELETE")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response).await["deleted"], true);
}

#[tokio::test]
async fn test_without_override_same_request_is_405() {
    let response = project_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tag")
                .header("authorization", bearer(42))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get("allow").unwrap(), "DELETE");
}

#[tokio::test]
async fn test_handler_status_kept_and_content_type_forced() {
    let response = project_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("authorization", bearer(42))
                .body(Body::from(r#"{"name":"Roadmap"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_to_json(response).await["created_by"], 42);
}

// == Cache Admin Function ==

#[tokio::test]
async fn test_health_route_reports_subject() {
    let response = cache_admin_app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("authorization", bearer(7))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["subject"], 7);
    assert_eq!(json["cache_phase"], "connected");
}

#[tokio::test]
async fn test_entries_crud() {
    let app = cache_admin_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/entries?key=settings")
                .header("authorization", bearer(7))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"value":{"lang":"fr"},"ttl":120}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response).await["ttl"], 120);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/entries?key=settings")
                .header("authorization", bearer(7))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response).await["value"], json!({ "lang": "fr" }));

    // Another caller does not see the entry.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/entries?key=settings")
                .header("authorization", bearer(8))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/entries?key=settings")
                .header("authorization", bearer(7))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/entries?key=settings")
                .header("authorization", bearer(7))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_entries_missing_key_is_400() {
    let response = cache_admin_app()
        .oneshot(
            Request::builder()
                .uri("/entries")
                .header("authorization", bearer(7))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response).await;
    assert_eq!(json["error"], "Bad Request");
    assert_eq!(json["details"], "key");
}

// == Transport Failures ==

fn oversized_put(authorization: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method("PUT").uri("/entries?key=big");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    builder.body(Body::from(vec![b'x'; 3 * 1024 * 1024])).unwrap()
}

#[tokio::test]
async fn test_oversized_body_is_413_envelope() {
    let response = cache_admin_app()
        .oneshot(oversized_put(Some(bearer(7))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let json = body_to_json(response).await;
    assert_eq!(json["error"], "Payload Too Large");
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn test_oversized_body_without_token_is_401() {
    let response = cache_admin_app()
        .oneshot(oversized_put(None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_to_json(response).await["message"], "No token provided");
}
