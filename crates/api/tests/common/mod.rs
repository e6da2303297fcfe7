#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use redacao_api::config::{GradingConfig, ServerConfig};
use redacao_api::middleware::auth::IDENTITY_HEADER;
use redacao_api::router::build_app_router;
use redacao_api::state::AppState;
use redacao_core::store::SubmissionStore;
use redacao_core::types::DbId;
use redacao_relay::{GradingRelay, RelayConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults and no grading webhook.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        grading: GradingConfig {
            webhook_url: None,
            timeout_secs: 5,
        },
    }
}

/// Build the full application router over `store`, without a grader.
pub fn build_test_app(store: Arc<dyn SubmissionStore>) -> Router {
    build_app(store, test_config(), None)
}

/// Build the full application router over `store`, grading via `webhook_url`.
pub fn build_test_app_with_grader(store: Arc<dyn SubmissionStore>, webhook_url: &str) -> Router {
    let mut config = test_config();
    config.grading.webhook_url = Some(webhook_url.to_string());
    let relay_config = RelayConfig::new(webhook_url, config.grading.timeout()).unwrap();
    let relay = GradingRelay::new(relay_config).unwrap();
    build_app(store, config, Some(Arc::new(relay)))
}

fn build_app(
    store: Arc<dyn SubmissionStore>,
    config: ServerConfig,
    relay: Option<Arc<GradingRelay>>,
) -> Router {
    let state = AppState { store, relay };
    build_app_router(state, &config)
}

/// Identity header value for `user_id`, as the gateway would send it.
pub fn identity(user_id: DbId) -> String {
    json!({ "id": user_id, "email": "aluno@example.com" }).to_string()
}

/// Send a GET request to the given URI and return the response.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a JSON body, optionally as `caller`.
pub async fn post_json(app: Router, uri: &str, caller: Option<DbId>, body: &Value) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(caller) = caller {
        builder = builder.header(IDENTITY_HEADER, identity(caller));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST with an arbitrary identity header value and raw body.
pub async fn post_raw(
    app: Router,
    uri: &str,
    identity_header: Option<&str>,
    content_type: Option<&str>,
    body: &str,
) -> Response {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(value) = identity_header {
        builder = builder.header(IDENTITY_HEADER, value);
    }
    if let Some(value) = content_type {
        builder = builder.header("content-type", value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
