//! Shared integration-test harness.
//!
//! Builds the full application router over the in-memory remote store so
//! tests exercise the exact middleware stack and handler wiring production
//! uses, without any network dependency.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use bundlekit_api::config::ServerConfig;
use bundlekit_api::router::build_app_router;
use bundlekit_api::state::AppState;
use bundlekit_store::bulk::BulkExecutor;
use bundlekit_store::bundle_store::BundleStore;
use bundlekit_store::combination_store::CombinationStore;
use bundlekit_store::media::PollPolicy;
use bundlekit_store::memory::InMemoryStore;
use bundlekit_store::sync::Synchronizer;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shop_domain: "test-shop.example.com".to_string(),
        api_version: "2025-07".to_string(),
        admin_token: "test-token".to_string(),
        cart_transform_id: "gid://shop/CartTransform/1".to_string(),
        media_poll_attempts: 5,
        media_poll_interval_ms: 0,
    }
}

/// The app under test plus a handle on the in-memory remote for
/// inspection and failure injection.
pub struct TestApp {
    pub app: Router,
    pub remote: Arc<InMemoryStore>,
}

/// Build the application with the default (fast) media poll budget.
pub fn build_test_app() -> TestApp {
    build_test_app_with_poll(PollPolicy {
        max_attempts: 5,
        interval: Duration::ZERO,
    })
}

/// Build the application with a specific media poll budget.
pub fn build_test_app_with_poll(poll: PollPolicy) -> TestApp {
    let config = test_config();
    let remote = Arc::new(InMemoryStore::new());

    let bundles = Arc::new(BundleStore::new(remote.clone()));
    let combinations = Arc::new(CombinationStore::new(remote.clone(), remote.clone(), poll));
    let bulk = Arc::new(BulkExecutor::new(bundles.clone()));
    let sync = Arc::new(Synchronizer::new(bundles.clone(), remote.clone()));

    let state = AppState {
        bundles,
        combinations,
        bulk,
        sync,
        config: Arc::new(config.clone()),
    };

    TestApp {
        app: build_app_router(state, &config),
        remote,
    }
}

/// Send a JSON request and return the status plus parsed JSON body.
pub async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    let request = match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Send a raw request (e.g. multipart) and return status plus parsed body.
pub async fn request_raw(
    app: &Router,
    method: &str,
    uri: &str,
    content_type: &str,
    body: Vec<u8>,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// A valid create-bundle payload with one step.
pub fn bundle_payload(title: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "status": status,
        "discount": { "type": "percentage", "value": 10.0 },
        "layout_type": "grid",
        "steps": [{
            "title": "Pick one",
            "position": 1,
            "min_selections": 1,
            "max_selections": 3,
            "required": true,
            "products": [
                { "product_id": "gid://shop/Product/1", "position": 1 }
            ]
        }]
    })
}

/// Create a bundle through the API and return its id.
pub async fn create_bundle(app: &Router, title: &str, status: &str) -> String {
    let (status_code, body) = request_json(
        app,
        "POST",
        "/api/v1/bundles",
        Some(bundle_payload(title, status)),
    )
    .await;
    assert_eq!(status_code, StatusCode::CREATED, "create failed: {body}");
    body["data"]["id"].as_str().unwrap().to_string()
}
