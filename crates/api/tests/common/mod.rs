//! Shared harness for the API integration tests.
//!
//! Builds the real router (same middleware stack as the binary) over the
//! in-memory store and queue, so the full HTTP surface is exercised without
//! a database.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use migplan_api::config::ServerConfig;
use migplan_api::engine::Dispatcher;
use migplan_api::router::build_app_router;
use migplan_api::state::AppState;
use migplan_core::error::CoreResult;
use migplan_core::{
    CoreError, Delivery, MemoryQueue, MemoryQueueConfig, MemoryTaskStore, TaskId, TaskStore,
    WorkQueue,
};

/// Server configuration for tests. The bind address is never used because
/// requests go through `oneshot`, not a socket.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".into()],
        request_timeout_secs: 30,
    }
}

/// Router plus handles on the collaborators behind it, so tests can attach
/// workers or inspect state directly.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryTaskStore>,
    pub queue: Arc<MemoryQueue>,
}

/// Build the application over fresh in-memory collaborators.
pub fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryTaskStore::new());
    let queue = Arc::new(MemoryQueue::new(MemoryQueueConfig::default()));
    let app = build_app_over(
        Arc::clone(&store) as Arc<dyn TaskStore>,
        Arc::clone(&queue) as Arc<dyn WorkQueue>,
    );
    TestApp { app, store, queue }
}

/// Build the application over explicit collaborators, for tests that swap
/// in a failing queue or share the store with a worker pool.
pub fn build_app_over(store: Arc<dyn TaskStore>, queue: Arc<dyn WorkQueue>) -> Router {
    let config = test_config();
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&store), queue));
    let state = AppState {
        store,
        dispatcher,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Queue stub whose enqueue always fails, for outage-path tests.
pub struct DownQueue;

#[async_trait]
impl WorkQueue for DownQueue {
    async fn enqueue(&self, task_id: TaskId) -> CoreResult<()> {
        Err(CoreError::EnqueueFailed {
            id: task_id,
            reason: "connection refused".into(),
        })
    }

    async fn dequeue(&self, _cancel: &CancellationToken) -> CoreResult<Option<Delivery>> {
        Ok(None)
    }

    async fn ack(&self, _delivery: &Delivery) -> CoreResult<()> {
        Ok(())
    }

    async fn nack(&self, _delivery: &Delivery) -> CoreResult<()> {
        Ok(())
    }
}

/// POST a JSON body and return the status code plus parsed response body.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// GET a path and return the status code plus parsed response body.
pub async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, body)
}

/// A well-formed submission body matching the request schema.
pub fn valid_request_body() -> serde_json::Value {
    serde_json::json!({
        "url": "jdbc:trino://localhost:8080/quests",
        "ddl": [{"statement": "CREATE TABLE t1 (x int)"}],
        "queries": [{
            "queryid": "b03dcf96-5f41-4a0a-b52e-e2b0ec217d61",
            "query": "SELECT x FROM t1",
            "runquantity": 100,
        }],
    })
}
