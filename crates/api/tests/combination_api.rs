//! Integration tests for the combination endpoints, including the
//! multipart upload path and the bounded media poll.

mod common;

use std::time::Duration;

use axum::http::StatusCode;

use bundlekit_store::media::PollPolicy;
use common::{build_test_app, build_test_app_with_poll, request_json, request_raw};

const BOUNDARY: &str = "test-boundary-4aa1";

/// Hand-build a multipart body with the given text fields and optional
/// image part.
fn multipart_body(fields: &[(&str, &str)], image: Option<&[u8]>) -> (String, Vec<u8>) {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some(bytes) = image {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"image\"; filename=\"combo.png\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

async fn create_combination(
    app: &axum::Router,
    product_ids: &str,
    title: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut fields = vec![("product_ids", product_ids)];
    if let Some(title) = title {
        fields.push(("title", title));
    }
    let (content_type, body) = multipart_body(&fields, Some(b"\x89PNG fake bytes"));
    request_raw(app, "POST", "/api/v1/combinations", &content_type, body).await
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_201_with_a_resolved_image_url() {
    let harness = build_test_app();

    let (status, body) = create_combination(&harness.app, "p1,p2", Some("Pair")).await;

    assert_eq!(status, StatusCode::CREATED, "body: {body}");
    let data = &body["data"];
    assert!(data["id"].as_str().unwrap().starts_with("gid://"));
    assert_eq!(data["product_ids"].as_array().unwrap().len(), 2);
    assert!(data["image"]["url"].as_str().unwrap().starts_with("https://"));
    assert_eq!(data["title"], "Pair");
}

#[tokio::test]
async fn create_without_an_image_part_is_rejected() {
    let harness = build_test_app();
    let (content_type, body) = multipart_body(&[("product_ids", "p1,p2")], None);

    let (status, body) = request_raw(
        &harness.app,
        "POST",
        "/api/v1/combinations",
        &content_type,
        body,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn create_with_a_single_product_is_rejected() {
    let harness = build_test_app();

    let (status, body) = create_combination(&harness.app, "p1", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn creating_the_same_set_twice_is_a_conflict() {
    let harness = build_test_app();
    create_combination(&harness.app, "p1,p2", None).await;

    // Same set, different order.
    let (status, body) = create_combination(&harness.app, "p2,p1", None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE");
}

// ---------------------------------------------------------------------------
// Upload poll budget
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exhausted_poll_budget_creates_no_record() {
    let harness = build_test_app_with_poll(PollPolicy {
        max_attempts: 2,
        interval: Duration::ZERO,
    });
    harness.remote.set_media_ready_after(50).await;

    let (status, body) = create_combination(&harness.app, "p1,p2", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL");
    assert_eq!(
        harness.remote.record_count("bundle_combination").await,
        0,
        "no combination record may reference an unresolved image",
    );
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn by_products_lookup_is_order_independent() {
    let harness = build_test_app();
    let (_, created) = create_combination(&harness.app, "p1,p2", None).await;

    let (status, body) = request_json(
        &harness.app,
        "GET",
        "/api/v1/combinations/by-products?ids=p2,p1",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], created["data"]["id"]);
}

#[tokio::test]
async fn by_products_miss_is_null_not_an_error() {
    let harness = build_test_app();

    let (status, body) = request_json(
        &harness.app,
        "GET",
        "/api/v1/combinations/by-products?ids=p8,p9",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn batch_listing_skips_missing_ids() {
    let harness = build_test_app();
    let (_, a) = create_combination(&harness.app, "p1,p2", None).await;
    let (_, b) = create_combination(&harness.app, "p3,p4", None).await;

    let ids = format!(
        "{},gid://shop/bundle_combination/999,{}",
        a["data"]["id"].as_str().unwrap(),
        b["data"]["id"].as_str().unwrap(),
    );
    let encoded = ids.replace("/", "%2F").replace(":", "%3A");

    let (status, body) = request_json(
        &harness.app,
        "GET",
        &format!("/api/v1/combinations?ids={encoded}"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn title_only_update_keeps_the_media() {
    let harness = build_test_app();
    let (_, created) = create_combination(&harness.app, "p1,p2", None).await;
    let id = created["data"]["id"].as_str().unwrap();
    let encoded = id.replace("/", "%2F").replace(":", "%3A");

    let (content_type, body) = multipart_body(&[("title", "Named later")], None);
    let (status, body) = request_raw(
        &harness.app,
        "PATCH",
        &format!("/api/v1/combinations/{encoded}"),
        &content_type,
        body,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Named later");
    assert_eq!(body["data"]["image"]["media_id"], created["data"]["image"]["media_id"]);
}

#[tokio::test]
async fn delete_returns_204_and_leaves_the_media_asset() {
    let harness = build_test_app();
    let (_, created) = create_combination(&harness.app, "p1,p2", None).await;
    let id = created["data"]["id"].as_str().unwrap();
    let encoded = id.replace("/", "%2F").replace(":", "%3A");

    let (status, _) = request_json(
        &harness.app,
        "DELETE",
        &format!("/api/v1/combinations/{encoded}"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(harness.remote.record_count("bundle_combination").await, 0);
    assert_eq!(harness.remote.media_asset_count().await, 1);
}
