//! Shared test utilities for sensorsrv integration tests

#![allow(dead_code)]
#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use ::common::sqlite::SqliteClient;
use async_trait::async_trait;
use errors::{MonitorError, MonitorResult};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

use sensorsrv::auth::{AuthGate, StaticPrincipalDirectory};
use sensorsrv::broadcast::{Broadcaster, SubscriberHub, Topic};
use sensorsrv::{api, AppState, PresencePolicy, Reading, ReadingStore, SqliteReadingStore};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Test environment backed by a temporary SQLite file
pub struct TestEnv {
    pub dir: TempDir,
    pub store: Arc<SqliteReadingStore>,
    pub hub: Arc<SubscriberHub>,
    pub gate: Arc<AuthGate>,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let client = SqliteClient::new(dir.path().join("monitoring.db"), 4)
            .await
            .unwrap();
        let store = SqliteReadingStore::open(client).await.unwrap();

        Self {
            dir,
            store: Arc::new(store),
            hub: Arc::new(SubscriberHub::new()),
            gate: Arc::new(AuthGate::new(
                TEST_SECRET,
                Arc::new(StaticPrincipalDirectory::default()),
            )),
        }
    }

    pub fn state(&self, auth: bool, policy: PresencePolicy) -> AppState {
        AppState::new(
            self.store.clone(),
            self.hub.clone(),
            auth.then(|| self.gate.clone()),
            policy,
        )
    }

    /// Router with auth enabled and the default validation policy
    pub fn router(&self) -> Router {
        api::create_router(self.state(true, PresencePolicy::Presence))
    }

    pub fn open_router(&self) -> Router {
        api::create_router(self.state(false, PresencePolicy::Presence))
    }

    pub fn token(&self) -> String {
        self.gate.issue("admin", "password").unwrap().token
    }
}

/// Broadcaster double that records every publish
#[derive(Default)]
pub struct RecordingBroadcaster {
    published: Mutex<Vec<(Topic, Value)>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(Topic, Value)> {
        self.published.lock().clone()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(&self, topic: Topic, payload: Value) -> usize {
        self.published.lock().push((topic, payload));
        1
    }

    fn subscriber_count(&self) -> usize {
        1
    }
}

/// Store double whose `fail_on`-th insert (1-based) and every later one fails.
/// Reads go to the wrapped store.
pub struct FailingStore {
    inner: Arc<SqliteReadingStore>,
    fail_on: usize,
    inserts: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<SqliteReadingStore>, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            inserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ReadingStore for FailingStore {
    async fn insert(
        &self,
        sensor_id: i64,
        temperature: f64,
        humidity: f64,
    ) -> MonitorResult<Reading> {
        let attempt = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt >= self.fail_on {
            return Err(MonitorError::Storage(
                "insert failed: database is locked".to_string(),
            ));
        }
        self.inner.insert(sensor_id, temperature, humidity).await
    }

    async fn recent(&self, limit: u32) -> MonitorResult<Vec<Reading>> {
        self.inner.recent(limit).await
    }

    async fn count(&self) -> MonitorResult<i64> {
        self.inner.count().await
    }
}

/// Send a request and decode the JSON body
pub async fn json_request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send(app, request).await
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body: Value = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, body)
}
