//! Sensor Service Library
//!
//! Telemetry ingestion for temperature/humidity sensors: readings are
//! validated, appended to SQLite, checked against fixed alarm thresholds and,
//! on alarm, pushed to every connected WebSocket subscriber.

pub mod alarm;
pub mod api;
pub mod auth;
pub mod broadcast;
pub mod config;
pub mod ingest;
pub mod query;
pub mod store;
pub mod websocket;

use common::sqlite::SqliteClient;
use errors::MonitorResult;
use std::sync::Arc;
use tracing::info;

pub use config::SensorsrvConfig;
pub use ingest::{IngestService, PresencePolicy, SendDataRequest, SimulationReport};
pub use query::QueryService;
pub use store::{Reading, ReadingStore, SqliteReadingStore};

use auth::{AuthGate, StaticPrincipalDirectory};
use broadcast::SubscriberHub;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub query: Arc<QueryService>,
    pub hub: Arc<SubscriberHub>,
    /// `None` when authentication is disabled
    pub auth: Option<Arc<AuthGate>>,
}

impl AppState {
    /// Wire the services around a store, with the hub as the ingest broadcaster
    pub fn new(
        store: Arc<dyn ReadingStore>,
        hub: Arc<SubscriberHub>,
        auth: Option<Arc<AuthGate>>,
        policy: PresencePolicy,
    ) -> Self {
        Self {
            ingest: Arc::new(IngestService::new(store.clone(), hub.clone(), policy)),
            query: Arc::new(QueryService::new(store)),
            hub,
            auth,
        }
    }

    /// Open the configured database and build the full state
    pub async fn from_config(config: &SensorsrvConfig) -> MonitorResult<Self> {
        let client =
            SqliteClient::new(&config.database.path, config.database.max_connections).await?;
        let store = SqliteReadingStore::open(client).await?;
        info!("Event store ready at {}", config.database.path.display());

        let auth = config.auth.enabled.then(|| {
            let directory =
                StaticPrincipalDirectory::new(&config.auth.username, &config.auth.password);
            Arc::new(AuthGate::new(&config.auth.jwt_secret, Arc::new(directory)))
        });
        if auth.is_none() {
            info!("Authentication disabled");
        }

        Ok(Self::new(
            Arc::new(store),
            Arc::new(SubscriberHub::new()),
            auth,
            config.validation.policy(),
        ))
    }
}
