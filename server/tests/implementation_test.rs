//! Integration tests for the test API.
//!
//! These run the full router over the in-process store and cache.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use docbridge_engine::memory::{MemoryCache, MemoryStore};
use docbridge_engine::{CacheClient, Database, Dispatcher, Services, WritePool};
use docbridge_server::config::{Config, MEMORY_URL};
use docbridge_server::{create_app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const TOKEN: &str = "test-secret";

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: MEMORY_URL.to_string(),
        database_name: "docbridge".to_string(),
        redis_url: Some(MEMORY_URL.to_string()),
        auth_token: TOKEN.to_string(),
        write_workers: 1,
        write_queue_capacity: 64,
        request_logging: false,
    }
}

fn create_test_app(with_cache: bool) -> (Router, Database) {
    create_test_app_with(with_cache, test_config())
}

fn create_test_app_with(with_cache: bool, config: Config) -> (Router, Database) {
    let db = Database::new(
        "docbridge",
        Arc::new(MemoryStore::new()),
        Arc::new(WritePool::new(1, 64).unwrap()),
    );
    let cache = with_cache.then(|| CacheClient::new(Arc::new(MemoryCache::new())));
    let dispatcher = Dispatcher::new(Services::new(db.clone(), cache));
    (create_app(AppState::new(dispatcher, config)), db)
}

async fn call(app: &Router, token: Option<&str>, body: impl Into<Body>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/test/implementation")
        .header("content-type", "application/json");
    if let Some(token) = token {
        request = request.header("auth-token", token);
    }

    let response = app
        .clone()
        .oneshot(request.body(body.into()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn dispatch(app: &Router, method: &str, data: Value) -> (StatusCode, Value) {
    let body = json!({ "method": method, "data": data }).to_string();
    call(app, Some(TOKEN), body).await
}

#[tokio::test]
async fn insert_returns_the_new_id() {
    let (app, db) = create_test_app(true);

    let (status, body) = dispatch(
        &app,
        "mongo-insert",
        json!({"collection": "users", "data": {"name": "Alice"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Success");
    assert_eq!(body["collection"], "users");
    let id = body["data"].as_str().unwrap();
    assert_eq!(id.len(), 24);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

    let stored = db.users().find_by_id(id).unwrap().unwrap();
    assert_eq!(stored.get_str("name").unwrap(), "Alice");
}

#[tokio::test]
async fn insert_then_get() {
    let (app, _db) = create_test_app(true);

    dispatch(
        &app,
        "mongo-insert",
        json!({"collection": "users", "data": [{"name": "Alice"}, {"name": "Bob"}]}),
    )
    .await;

    let (status, body) = dispatch(
        &app,
        "mongo-get",
        json!({"collection": "users", "data": {"name": "Bob"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let found = body["data"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Bob");
    assert!(found[0]["_id"].is_string());
}

#[tokio::test]
async fn bad_token_is_rejected() {
    let (app, db) = create_test_app(true);
    let body = json!({
        "method": "mongo-insert",
        "data": {"collection": "users", "data": {"name": "Mallory"}},
    })
    .to_string();

    for token in [Some("wrong"), Some(""), None] {
        let (status, response) = call(&app, token, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            response,
            json!({"status": "false", "message": "Authentication failed"})
        );
    }

    assert_eq!(db.users().count(bson::Document::new()).unwrap(), 0);
}

#[tokio::test]
async fn bad_token_wins_over_bad_body() {
    let (app, _db) = create_test_app(true);

    let (status, _) = call(&app, Some("wrong"), "{not json").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_method_fails() {
    let (app, _db) = create_test_app(true);

    let (status, body) = dispatch(&app, "drop-everything", json!({})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "false");
    assert!(body["message"].as_str().unwrap().contains("drop-everything"));
}

#[tokio::test]
async fn malformed_body_fails() {
    let (app, _db) = create_test_app(true);

    let (status, body) = call(&app, Some(TOKEN), "{not json").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "false");
}

#[tokio::test]
async fn cache_round_trip() {
    let (app, _db) = create_test_app(true);

    let (status, body) = dispatch(
        &app,
        "cache-store",
        json!({"key": "session:1", "value": {"user": "alice"}, "expire": 60}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "Executed", "key": "session:1", "data": true}));

    let (_, body) = dispatch(&app, "cache-get", json!({"key": "session:1"})).await;
    assert_eq!(body["data"], json!({"user": "alice"}));

    let (_, body) = dispatch(&app, "cache-delete", json!({"key": "session:1"})).await;
    assert_eq!(body["status"], "Executed");

    let (_, body) = dispatch(&app, "cache-get", json!({"key": "session:1"})).await;
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn cache_methods_fail_without_a_cache() {
    let (app, _db) = create_test_app(false);

    let (status, body) = dispatch(&app, "cache-get", json!({"key": "k"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "false");
}

#[tokio::test]
async fn oversized_expiry_is_a_failure_envelope() {
    let (app, _db) = create_test_app(true);

    let (status, body) = dispatch(
        &app,
        "cache-store",
        json!({"key": "k", "value": "v", "expire": u64::MAX}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "false");
    assert!(body["message"].as_str().unwrap().contains("expire"));
}

#[tokio::test]
async fn cache_check_without_a_cache_reports_error() {
    let (app, _db) = create_test_app(false);

    let (status, body) = dispatch(&app, "cache-connection-check", Value::Null).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Error");
    assert_eq!(body["message"], "cache is not configured");
}

#[tokio::test]
async fn every_request_is_audited() {
    let mut config = test_config();
    config.request_logging = true;
    let (app, db) = create_test_app_with(true, config);

    dispatch(
        &app,
        "mongo-insert",
        json!({"collection": "users", "data": {"name": "Alice"}}),
    )
    .await;
    dispatch(&app, "drop-everything", json!({})).await;
    dispatch(
        &app,
        "cache-store",
        json!({"key": "k", "value": "v", "expire": u64::MAX}),
    )
    .await;

    // Rejected before dispatch, so never audited
    call(&app, Some("wrong"), "{}").await;

    db.pool().shutdown();

    let logs = db.request_logs().find_all(bson::Document::new(), 0, 0).unwrap();
    assert_eq!(logs.len(), 3);

    let succeeded = |method: &str| {
        let log = logs
            .iter()
            .find(|log| log.get_str("method").unwrap() == method)
            .unwrap();
        assert!(log.get_str("request_id").is_ok());
        assert!(log.get_datetime("created_at").is_ok());
        log.get_bool("succeeded").unwrap()
    };
    assert!(succeeded("mongo-insert"));
    assert!(!succeeded("drop-everything"));
    assert!(!succeeded("cache-store"));
}

#[tokio::test]
async fn health_and_root() {
    let (app, _db) = create_test_app(true);

    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"Hello World");

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
