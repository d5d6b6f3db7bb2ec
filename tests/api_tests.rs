//! HTTP API Integration Tests
//! Tests for the REST API endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tillsync::{create_router, ManualConnectivity, MonitorHandle, OfflineConfig, OfflineContext};
use tower::util::ServiceExt;

struct TestApp {
    router: axum::Router,
    ctx: OfflineContext,
    _monitor: MonitorHandle,
    _dir: TempDir,
}

/// Helper to create a test app backed by RocksDB in a temp dir
fn create_test_app(online: bool) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = OfflineConfig::default()
        .with_data_dir(temp_dir.path())
        .with_start_online(online);
    let ctx = OfflineContext::open(config).expect("Failed to open offline store");
    let connectivity = Arc::new(ManualConnectivity::new(online));
    let monitor = ctx.start_monitor(connectivity.clone());
    let router = create_router(ctx.clone(), connectivity);
    TestApp {
        router,
        ctx,
        _monitor: monitor,
        _dir: temp_dir,
    }
}

async fn send(app: &axum::Router, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(path);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(json!(null));
    (status, json)
}

async fn get(app: &axum::Router, path: &str) -> (StatusCode, Value) {
    send(app, "GET", path, None).await
}

async fn post_json(app: &axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", path, Some(body)).await
}

async fn put_json(app: &axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", path, Some(body)).await
}

async fn wait_for_online(ctx: &OfflineContext, online: bool) {
    let mut rx = ctx.status_ref().watch_online();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| *v == online))
        .await
        .expect("timed out waiting for connectivity change")
        .unwrap();
}

// ==================== Status API Tests ====================

#[tokio::test]
async fn test_status_reports_initial_state() {
    let app = create_test_app(true);

    let (status, body) = get(&app.router, "/_api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_online"], true);
    assert_eq!(body["is_syncing"], false);
    assert_eq!(body["pending_actions_count"], 0);
    assert!(body["last_sync_time"].is_null());
}

#[tokio::test]
async fn test_connectivity_toggle() {
    let app = create_test_app(true);

    let (status, body) = put_json(&app.router, "/_api/connectivity", json!({"online": false})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"online": false, "changed": true}));
    wait_for_online(&app.ctx, false).await;

    let (_, body) = put_json(&app.router, "/_api/connectivity", json!({"online": false})).await;
    assert_eq!(body["changed"], false);

    let (_, body) = get(&app.router, "/_api/status").await;
    assert_eq!(body["is_online"], false);
}

// ==================== Cache API Tests ====================

#[tokio::test]
async fn test_cache_put_and_get() {
    let app = create_test_app(true);

    let (status, body) = put_json(&app.router, "/_api/cache/menu", json!({"soup": 4.5})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"key": "menu", "saved": true}));

    let (status, body) = get(&app.router, "/_api/cache/menu").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"soup": 4.5}));
}

#[tokio::test]
async fn test_cache_missing_key_is_404() {
    let app = create_test_app(true);

    let (status, body) = get(&app.router, "/_api/cache/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert_eq!(body["type"], "NotFound");
}

#[tokio::test]
async fn test_cache_reserved_key_rejected() {
    let app = create_test_app(true);

    let (status, body) = put_json(&app.router, "/_api/cache/_internal", json!(1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "BadRequest");
}

#[tokio::test]
async fn test_cache_sweep_with_nothing_expired() {
    let app = create_test_app(true);
    put_json(&app.router, "/_api/cache/menu", json!([])).await;

    let (status, body) = post_json(&app.router, "/_api/cache/_sweep", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 0);
    assert!(app.ctx.get_entry("menu").is_some());
}

// ==================== Pending Actions API Tests ====================

#[tokio::test]
async fn test_queue_and_list_actions() {
    let app = create_test_app(false);

    let (status, body) = post_json(
        &app.router,
        "/_api/actions",
        json!({"action": "insert", "table": "orders", "data": {"table": 9, "total": 31.0}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"queued": true, "pending": 1}));

    post_json(
        &app.router,
        "/_api/actions",
        json!({"action": "update", "table": "tables", "data": {"id": 9}}),
    )
    .await;

    let (status, body) = get(&app.router, "/_api/actions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["actions"][0]["action"], "insert");
    assert_eq!(body["actions"][0]["data"]["table"], 9);
    assert_eq!(body["actions"][1]["table"], "tables");
    assert_ne!(body["actions"][0]["id"], body["actions"][1]["id"]);
}

#[tokio::test]
async fn test_queue_action_requires_action_and_table() {
    let app = create_test_app(false);

    let (status, _) = post_json(&app.router, "/_api/actions", json!({"action": "insert", "table": " "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.ctx.pending_actions_count(), 0);
}

// ==================== Sync API Tests ====================

#[tokio::test]
async fn test_sync_skipped_while_offline() {
    let app = create_test_app(false);
    post_json(&app.router, "/_api/actions", json!({"action": "insert", "table": "orders"})).await;

    let (status, body) = post_json(&app.router, "/_api/sync", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "skipped", "reason": "offline"}));
    assert_eq!(app.ctx.pending_actions_count(), 1);
}

#[tokio::test]
async fn test_sync_drains_queue_when_online() {
    let app = create_test_app(true);
    app.ctx.register_sync_fn("orders", || async { Ok(()) });
    post_json(&app.router, "/_api/actions", json!({"action": "insert", "table": "orders"})).await;

    let (status, body) = post_json(&app.router, "/_api/sync", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["succeeded"], json!(["orders"]));
    assert_eq!(body["cleared_actions"], 1);

    let (_, body) = get(&app.router, "/_api/status").await;
    assert_eq!(body["pending_actions_count"], 0);
    assert!(body["last_sync_time"].is_string());
}
