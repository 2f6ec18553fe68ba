//! Ingest service
//!
//! validate -> persist -> evaluate -> (maybe) broadcast.
//!
//! A failed write fails the whole submission. A broadcast with nobody
//! listening is not an error.

use errors::{MonitorError, MonitorResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::alarm::AlarmPayload;
use crate::broadcast::{Broadcaster, Topic};
use crate::store::{Reading, ReadingStore};

/// Number of synthetic sensors driven by a simulation run (ids 1..=50)
pub const SIMULATED_SENSOR_COUNT: i64 = 50;

/// Synthetic temperature range (°C)
pub const SIMULATED_TEMPERATURE: (f64, f64) = (15.0, 50.0);

/// Synthetic humidity range (%)
pub const SIMULATED_HUMIDITY: (f64, f64) = (10.0, 90.0);

/// How to decide that a field is absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresencePolicy {
    /// Only null/missing fields are rejected
    #[default]
    Presence,
    /// Zero values are rejected as well (legacy behaviour)
    Falsy,
}

/// Body of `POST /send_data`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SendDataRequest {
    pub sensor_id: Option<i64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// Fields that passed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidReading {
    pub sensor_id: i64,
    pub temperature: f64,
    pub humidity: f64,
}

impl SendDataRequest {
    pub fn validate(&self, policy: PresencePolicy) -> MonitorResult<ValidReading> {
        let zero_rejected = policy == PresencePolicy::Falsy;

        let sensor_id = self
            .sensor_id
            .filter(|v| !(zero_rejected && *v == 0))
            .ok_or_else(|| MonitorError::invalid_field("sensor_id", "missing"))?;
        let temperature = self
            .temperature
            .filter(|v| !(zero_rejected && *v == 0.0))
            .ok_or_else(|| MonitorError::invalid_field("temperature", "missing"))?;
        let humidity = self
            .humidity
            .filter(|v| !(zero_rejected && *v == 0.0))
            .ok_or_else(|| MonitorError::invalid_field("humidity", "missing"))?;

        if !temperature.is_finite() || !humidity.is_finite() {
            return Err(MonitorError::Validation(
                "temperature and humidity must be finite numbers".to_string(),
            ));
        }

        Ok(ValidReading {
            sensor_id,
            temperature,
            humidity,
        })
    }
}

/// Outcome of a simulation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub inserted: usize,
    pub alarms: usize,
}

pub struct IngestService {
    store: Arc<dyn ReadingStore>,
    broadcaster: Arc<dyn Broadcaster>,
    policy: PresencePolicy,
}

impl IngestService {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        broadcaster: Arc<dyn Broadcaster>,
        policy: PresencePolicy,
    ) -> Self {
        Self {
            store,
            broadcaster,
            policy,
        }
    }

    pub fn policy(&self) -> PresencePolicy {
        self.policy
    }

    /// Validate, persist, and alarm on one submitted reading
    pub async fn submit(&self, request: &SendDataRequest) -> MonitorResult<Reading> {
        let valid = request.validate(self.policy)?;
        let (reading, _) = self.record(valid).await?;
        Ok(reading)
    }

    /// Persist and alarm. Returns the stored row and whether an alarm was raised.
    async fn record(&self, valid: ValidReading) -> MonitorResult<(Reading, bool)> {
        let reading = self
            .store
            .insert(valid.sensor_id, valid.temperature, valid.humidity)
            .await?;

        let Some(alarm) =
            AlarmPayload::check(reading.sensor_id, reading.temperature, reading.humidity)
        else {
            return Ok((reading, false));
        };

        warn!(
            sensor_id = alarm.sensor_id,
            temperature = alarm.temperature,
            humidity = alarm.humidity,
            "Alarm condition"
        );
        match serde_json::to_value(&alarm) {
            Ok(payload) => {
                self.broadcaster.publish(Topic::Alarm, payload);
            },
            Err(e) => warn!("Alarm payload not serializable: {}", e),
        }

        Ok((reading, true))
    }

    /// One synthetic reading per sensor id 1..=50 using the thread RNG
    pub async fn simulate(&self) -> MonitorResult<SimulationReport> {
        let batch = synthesize_batch(&mut rand::thread_rng());
        self.record_batch(batch).await
    }

    /// Same as [`simulate`](Self::simulate) with a caller-provided RNG
    pub async fn simulate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> MonitorResult<SimulationReport> {
        let batch = synthesize_batch(rng);
        self.record_batch(batch).await
    }

    // Independent inserts: a failure part-way leaves earlier rows in place
    async fn record_batch(&self, batch: Vec<ValidReading>) -> MonitorResult<SimulationReport> {
        let mut report = SimulationReport::default();
        for valid in batch {
            let (_, alarmed) = self.record(valid).await?;
            report.inserted += 1;
            report.alarms += usize::from(alarmed);
        }

        info!(
            inserted = report.inserted,
            alarms = report.alarms,
            "Simulation completed"
        );
        Ok(report)
    }
}

/// Draw one reading per simulated sensor
pub fn synthesize_batch<R: Rng + ?Sized>(rng: &mut R) -> Vec<ValidReading> {
    (1..=SIMULATED_SENSOR_COUNT)
        .map(|sensor_id| ValidReading {
            sensor_id,
            temperature: rng.gen_range(SIMULATED_TEMPERATURE.0..=SIMULATED_TEMPERATURE.1),
            humidity: rng.gen_range(SIMULATED_HUMIDITY.0..=SIMULATED_HUMIDITY.1),
        })
        .collect()
}
