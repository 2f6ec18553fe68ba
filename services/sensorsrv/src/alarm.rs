//! Alarm evaluation
//!
//! Every reading is judged on its own: no hysteresis and no debouncing, so a
//! sensor hovering around a threshold raises one alarm per qualifying reading.

use serde::{Deserialize, Serialize};

/// Temperatures strictly above this raise an alarm (°C)
pub const TEMPERATURE_ALARM_THRESHOLD: f64 = 40.0;

/// Relative humidity strictly below this raises an alarm (%)
pub const HUMIDITY_ALARM_THRESHOLD: f64 = 20.0;

/// Returns true when the reading is in an alarm condition
pub fn evaluate(temperature: f64, humidity: f64) -> bool {
    temperature > TEMPERATURE_ALARM_THRESHOLD || humidity < HUMIDITY_ALARM_THRESHOLD
}

/// Payload broadcast on the `alarm` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmPayload {
    pub sensor_id: i64,
    pub temperature: f64,
    pub humidity: f64,
}

impl AlarmPayload {
    /// Build the payload if the values are in alarm, `None` otherwise
    pub fn check(sensor_id: i64, temperature: f64, humidity: f64) -> Option<Self> {
        evaluate(temperature, humidity).then_some(Self {
            sensor_id,
            temperature,
            humidity,
        })
    }
}
