//! API request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::ingest::SendDataRequest;

pub const HEALTH_OK: &str = "ok";
pub const DATA_LOGGED: &str = "Data logged successfully";
pub const SIMULATION_COMPLETED: &str = "Simulation completed";

/// Login request. Absent fields behave like wrong credentials.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Response of a successful `/send_data`
#[derive(Debug, Serialize, Deserialize)]
pub struct SendDataResponse {
    pub message: String,
    pub id: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimulateResponse {
    pub message: String,
    pub inserted: usize,
    pub alarms: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub subscribers: usize,
    pub auth_enabled: bool,
}
