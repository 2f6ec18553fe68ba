//! API handlers for the sensor service

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    Extension,
};
use errors::{MonitorError, MonitorResult};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::models::*;
use crate::auth::{AuthGate, AuthenticatedPrincipal};
use crate::broadcast::Broadcaster;
use crate::store::Reading;
use crate::AppState;

// Malformed JSON is a client error like any other validation failure
fn rejected(rejection: JsonRejection) -> MonitorError {
    MonitorError::Validation(rejection.body_text())
}

/// Principal id for log lines; `anonymous` when auth is disabled
fn principal_id(principal: &Option<Extension<AuthenticatedPrincipal>>) -> &str {
    principal
        .as_ref()
        .map_or("anonymous", |Extension(p)| p.0.as_str())
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HEALTH_OK.to_string(),
        service: "sensorsrv".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        subscribers: state.hub.subscriber_count(),
        auth_enabled: state.auth.is_some(),
    })
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(gate): State<Arc<AuthGate>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> MonitorResult<Json<LoginResponse>> {
    let Json(req) = payload.map_err(rejected)?;
    let issued = gate.issue(&req.username, &req.password)?;
    Ok(Json(LoginResponse {
        token: issued.token,
    }))
}

/// Ingest one reading
pub async fn send_data(
    State(state): State<AppState>,
    principal: Option<Extension<AuthenticatedPrincipal>>,
    payload: Result<Json<SendDataRequest>, JsonRejection>,
) -> MonitorResult<Json<SendDataResponse>> {
    let Json(req) = payload.map_err(rejected)?;
    let reading = state.ingest.submit(&req).await?;

    debug!(
        id = reading.id,
        sensor_id = reading.sensor_id,
        principal = principal_id(&principal),
        "Data logged"
    );
    Ok(Json(SendDataResponse {
        message: DATA_LOGGED.to_string(),
        id: reading.id,
        timestamp: reading.timestamp,
    }))
}

/// The most recent readings, newest first
pub async fn list_events(State(state): State<AppState>) -> MonitorResult<Json<Vec<Reading>>> {
    let events = state.query.list_recent().await?;
    Ok(Json(events))
}

/// Run the ingest path for every simulated sensor
pub async fn simulate(
    State(state): State<AppState>,
    principal: Option<Extension<AuthenticatedPrincipal>>,
) -> MonitorResult<Json<SimulateResponse>> {
    let report = state.ingest.simulate().await?;
    info!(
        inserted = report.inserted,
        alarms = report.alarms,
        principal = principal_id(&principal),
        "Simulation requested"
    );
    Ok(Json(SimulateResponse {
        message: SIMULATION_COMPLETED.to_string(),
        inserted: report.inserted,
        alarms: report.alarms,
    }))
}
