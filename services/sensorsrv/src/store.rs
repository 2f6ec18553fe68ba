//! Event store
//!
//! Append-only persistence of sensor readings. Rows are never updated or
//! deleted; `id` is assigned by SQLite's AUTOINCREMENT so it is strictly
//! increasing in commit order.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use common::sqlite::SqliteClient;
use errors::{MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cap applied by the events endpoint
pub const RECENT_EVENTS_LIMIT: u32 = 100;

/// One persisted sensor measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub sensor_id: i64,
    pub temperature: f64,
    pub humidity: f64,
}

/// Storage backend for readings
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist one reading, assigning `id` and `timestamp`
    async fn insert(&self, sensor_id: i64, temperature: f64, humidity: f64)
        -> MonitorResult<Reading>;

    /// Up to `limit` most recent readings, newest first (ties broken by id)
    async fn recent(&self, limit: u32) -> MonitorResult<Vec<Reading>>;

    /// Total number of stored readings
    async fn count(&self) -> MonitorResult<i64>;
}

const CREATE_EVENTS_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        sensor_id INTEGER NOT NULL,
        temperature REAL NOT NULL,
        humidity REAL NOT NULL
    )";

const CREATE_RECENCY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_events_recency ON events(timestamp DESC, id DESC)";

/// Fixed-width UTC timestamp so that text order matches time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> MonitorResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    // Rows written by older tools carry naive local ISO-8601 without an offset
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| MonitorError::Storage(format!("bad timestamp {:?}: {}", raw, e)))
}

#[derive(sqlx::FromRow)]
struct ReadingRow {
    id: i64,
    timestamp: String,
    sensor_id: i64,
    temperature: f64,
    humidity: f64,
}

impl TryFrom<ReadingRow> for Reading {
    type Error = MonitorError;

    fn try_from(row: ReadingRow) -> MonitorResult<Self> {
        Ok(Self {
            id: row.id,
            timestamp: parse_timestamp(&row.timestamp)?,
            sensor_id: row.sensor_id,
            temperature: row.temperature,
            humidity: row.humidity,
        })
    }
}

fn storage_error(op: &str, err: sqlx::Error) -> MonitorError {
    MonitorError::Storage(format!("{} failed: {}", op, err))
}

/// SQLite-backed [`ReadingStore`]
#[derive(Clone)]
pub struct SqliteReadingStore {
    client: SqliteClient,
}

impl SqliteReadingStore {
    /// Wrap a client and make sure the schema exists
    pub async fn open(client: SqliteClient) -> MonitorResult<Self> {
        sqlx::query(CREATE_EVENTS_TABLE)
            .execute(client.pool())
            .await
            .map_err(|e| storage_error("create events table", e))?;
        sqlx::query(CREATE_RECENCY_INDEX)
            .execute(client.pool())
            .await
            .map_err(|e| storage_error("create recency index", e))?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &SqliteClient {
        &self.client
    }
}

#[async_trait]
impl ReadingStore for SqliteReadingStore {
    async fn insert(
        &self,
        sensor_id: i64,
        temperature: f64,
        humidity: f64,
    ) -> MonitorResult<Reading> {
        // Stored with microsecond precision, so keep the returned value identical
        let timestamp = Utc::now().trunc_subsecs(6);

        let result = sqlx::query(
            "INSERT INTO events (timestamp, sensor_id, temperature, humidity) VALUES (?, ?, ?, ?)",
        )
        .bind(format_timestamp(&timestamp))
        .bind(sensor_id)
        .bind(temperature)
        .bind(humidity)
        .execute(self.client.pool())
        .await
        .map_err(|e| storage_error("insert reading", e))?;

        let reading = Reading {
            id: result.last_insert_rowid(),
            timestamp,
            sensor_id,
            temperature,
            humidity,
        };
        debug!(id = reading.id, sensor_id, "Reading stored");
        Ok(reading)
    }

    async fn recent(&self, limit: u32) -> MonitorResult<Vec<Reading>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<ReadingRow> = sqlx::query_as(
            "SELECT id, timestamp, sensor_id, temperature, humidity FROM events \
             ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(self.client.pool())
        .await
        .map_err(|e| storage_error("query recent readings", e))?;

        rows.into_iter().map(Reading::try_from).collect()
    }

    async fn count(&self) -> MonitorResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(self.client.pool())
            .await
            .map_err(|e| storage_error("count readings", e))?;
        Ok(count)
    }
}
