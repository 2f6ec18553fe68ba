//! API integration tests

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

mod support;
use support::{json_request, send, FailingStore, TestEnv};

use sensorsrv::broadcast::HubMessage;
use sensorsrv::{api, AppState, PresencePolicy, ReadingStore};

fn reading(sensor_id: i64, temperature: f64, humidity: f64) -> Value {
    json!({ "sensor_id": sensor_id, "temperature": temperature, "humidity": humidity })
}

/// Register a fake subscriber with the hub and swallow its welcome frame
fn subscribe(env: &TestEnv, name: &str) -> mpsc::UnboundedReceiver<HubMessage> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    env.hub.register(name.to_string(), tx);
    rx.try_recv().unwrap();
    rx
}

fn next_event(rx: &mut mpsc::UnboundedReceiver<HubMessage>) -> Option<Value> {
    match rx.try_recv().ok()? {
        HubMessage::Text(text) => Some(serde_json::from_str(&text).unwrap()),
        HubMessage::Close => None,
    }
}

// ============================================================================
// Public endpoints
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let env = TestEnv::new().await;
    let _rx = subscribe(&env, "watcher");

    let (status, body) = json_request(&env.router(), "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "sensorsrv");
    assert_eq!(body["subscribers"], 1);
    assert_eq!(body["auth_enabled"], true);
}

#[tokio::test]
async fn test_login_returns_token() {
    let env = TestEnv::new().await;

    let (status, body) = json_request(
        &env.router(),
        "POST",
        "/login",
        None,
        Some(json!({"username": "admin", "password": "password"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    assert_eq!(env.gate.validate(Some(token)).unwrap(), "admin");
}

#[tokio::test]
async fn test_login_rejects_wrong_credentials() {
    let env = TestEnv::new().await;
    let app = env.router();

    for creds in [
        json!({"username": "admin", "password": "wrong"}),
        json!({"username": "guest", "password": "password"}),
        json!({}),
    ] {
        let (status, body) = json_request(&app, "POST", "/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
        assert!(body["error"].is_string());
    }
}

// ============================================================================
// Auth gate in front of the data endpoints
// ============================================================================

#[tokio::test]
async fn test_protected_routes_require_token() {
    let env = TestEnv::new().await;
    let app = env.router();

    for (method, uri, body) in [
        ("POST", "/send_data", Some(reading(1, 25.0, 50.0))),
        ("GET", "/events", None),
        ("POST", "/simulate", None),
    ] {
        let (status, resp) = json_request(&app, method, uri, None, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(resp["code"], "AUTH_MISSING");
    }

    assert_eq!(env.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_authorization_headers() {
    let env = TestEnv::new().await;
    let app = env.router();
    let token = env.token();

    for value in [
        format!("Token {}", token),
        "Bearer not-a-jwt".to_string(),
        format!("Bearer {}x", token),
    ] {
        let request = Request::builder()
            .method("GET")
            .uri("/events")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "AUTH_MALFORMED");
    }
}

#[tokio::test]
async fn test_expired_token_is_rejected_without_write() {
    let env = TestEnv::new().await;
    let stale = env
        .gate
        .issue_at("admin", "password", Utc::now() - Duration::hours(2))
        .unwrap();

    let (status, body) = json_request(
        &env.router(),
        "POST",
        "/send_data",
        Some(&stale.token),
        Some(reading(1, 25.0, 50.0)),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_EXPIRED");
    assert_eq!(env.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_auth_disabled_serves_without_token() {
    let env = TestEnv::new().await;
    let app = env.open_router();

    let (status, _) = json_request(&app, "POST", "/send_data", None, Some(reading(3, 22.0, 40.0))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, events) = json_request(&app, "GET", "/events", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.as_array().unwrap().len(), 1);

    let (status, _) = json_request(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({"username": "admin", "password": "password"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, health) = json_request(&app, "GET", "/health", None, None).await;
    assert_eq!(health["auth_enabled"], false);
}

// ============================================================================
// Ingest
// ============================================================================

#[tokio::test]
async fn test_send_data_normal_reading_publishes_nothing() {
    let env = TestEnv::new().await;
    let mut rx = subscribe(&env, "watcher");
    let token = env.token();

    let (status, body) = json_request(
        &env.router(),
        "POST",
        "/send_data",
        Some(&token),
        Some(reading(2, 25.0, 50.0)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Data logged successfully");
    assert!(body["id"].as_i64().unwrap() > 0);
    assert!(body["timestamp"].is_string());
    assert_eq!(env.store.count().await.unwrap(), 1);
    assert!(next_event(&mut rx).is_none());
}

#[tokio::test]
async fn test_send_data_alarm_reaches_subscribers() {
    let env = TestEnv::new().await;
    let mut first = subscribe(&env, "first");
    let mut second = subscribe(&env, "second");
    let token = env.token();
    let app = env.router();

    let (status, _) = json_request(&app, "POST", "/send_data", Some(&token), Some(reading(5, 42.5, 15.0))).await;
    assert_eq!(status, StatusCode::OK);

    for rx in [&mut first, &mut second] {
        let event = next_event(rx).unwrap();
        assert_eq!(event["event"], "alarm");
        assert_eq!(event["data"], json!({"sensor_id": 5, "temperature": 42.5, "humidity": 15.0}));
        assert!(next_event(rx).is_none());
    }

    // Humidity alone also triggers
    json_request(&app, "POST", "/send_data", Some(&token), Some(reading(6, 20.0, 19.9))).await;
    assert_eq!(next_event(&mut first).unwrap()["data"]["sensor_id"], 6);

    // Boundary values do not
    json_request(&app, "POST", "/send_data", Some(&token), Some(reading(7, 40.0, 20.0))).await;
    assert!(next_event(&mut first).is_none());
}

#[tokio::test]
async fn test_send_data_missing_field_is_validation_error() {
    let env = TestEnv::new().await;
    let mut rx = subscribe(&env, "watcher");
    let token = env.token();
    let app = env.router();

    for body in [
        json!({"temperature": 45.0, "humidity": 50.0}),
        json!({"sensor_id": 1, "humidity": 50.0}),
        json!({"sensor_id": 1, "temperature": 45.0, "humidity": null}),
    ] {
        let (status, resp) = json_request(&app, "POST", "/send_data", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp["error"].is_string());
    }

    assert_eq!(env.store.count().await.unwrap(), 0);
    assert!(next_event(&mut rx).is_none());
}

#[tokio::test]
async fn test_send_data_malformed_json_is_bad_request() {
    let env = TestEnv::new().await;
    let token = env.token();
    let app = env.router();

    let request = Request::builder()
        .method("POST")
        .uri("/send_data")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"sensor_id\": 1, \"temperature\": "))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = json_request(
        &app,
        "POST",
        "/send_data",
        Some(&token),
        Some(json!({"sensor_id": "one", "temperature": 20.0, "humidity": 50.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_zero_sensor_id_accepted_by_default() {
    let env = TestEnv::new().await;
    let token = env.token();

    let (status, _) = json_request(
        &env.router(),
        "POST",
        "/send_data",
        Some(&token),
        Some(reading(0, 25.0, 50.0)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(env.store.recent(1).await.unwrap()[0].sensor_id, 0);
}

#[tokio::test]
async fn test_zero_sensor_id_rejected_under_falsy_policy() {
    let env = TestEnv::new().await;
    let token = env.token();
    let app = sensorsrv::api::create_router(env.state(true, PresencePolicy::Falsy));

    let (status, _) = json_request(&app, "POST", "/send_data", Some(&token), Some(reading(0, 25.0, 50.0))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(env.store.count().await.unwrap(), 0);
}

// ============================================================================
// Query and simulation
// ============================================================================

#[tokio::test]
async fn test_events_newest_first_and_capped() {
    let env = TestEnv::new().await;
    for i in 1..=105 {
        env.store.insert(i, 20.0, 50.0).await.unwrap();
    }

    let (status, body) = json_request(&env.router(), "GET", "/events", Some(&env.token()), None).await;

    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 100);
    assert_eq!(events[0]["sensor_id"], 105);
    assert_eq!(events[99]["sensor_id"], 6);
    let ids: Vec<i64> = events.iter().map(|e| e["id"].as_i64().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] > w[1]));
    for field in ["id", "timestamp", "sensor_id", "temperature", "humidity"] {
        assert!(!events[0][field].is_null(), "missing {}", field);
    }
}

#[tokio::test]
async fn test_events_empty_store() {
    let env = TestEnv::new().await;
    let (status, body) = json_request(&env.router(), "GET", "/events", Some(&env.token()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_simulate_inserts_one_reading_per_sensor() {
    let env = TestEnv::new().await;
    let mut rx = subscribe(&env, "watcher");

    let (status, body) = json_request(&env.router(), "POST", "/simulate", Some(&env.token()), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Simulation completed");
    assert_eq!(body["inserted"], 50);
    assert_eq!(env.store.count().await.unwrap(), 50);

    let mut sensors: Vec<i64> = env
        .store
        .recent(100)
        .await
        .unwrap()
        .iter()
        .map(|r| r.sensor_id)
        .collect();
    sensors.sort_unstable();
    assert_eq!(sensors, (1..=50).collect::<Vec<_>>());

    let mut alarms = 0;
    while let Some(event) = next_event(&mut rx) {
        assert_eq!(event["event"], "alarm");
        alarms += 1;
    }
    assert_eq!(body["alarms"], alarms);
}

#[tokio::test]
async fn test_send_data_storage_failure_hides_detail() {
    let env = TestEnv::new().await;
    let mut rx = subscribe(&env, "watcher");
    let store = Arc::new(FailingStore::new(env.store.clone(), 1));
    let state = AppState::new(
        store,
        env.hub.clone(),
        Some(env.gate.clone()),
        PresencePolicy::Presence,
    );
    let app = api::create_router(state);
    let token = env.token();

    let (status, body) = json_request(
        &app,
        "POST",
        "/send_data",
        Some(&token),
        Some(reading(4, 48.0, 12.0)),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Storage unavailable");
    assert_eq!(body["code"], "STORAGE_ERROR");
    assert!(!body.to_string().contains("locked"));
    assert!(next_event(&mut rx).is_none());
    assert_eq!(env.store.count().await.unwrap(), 0);
}
