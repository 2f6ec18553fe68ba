//! Query service: bounded read of recent history

use errors::MonitorResult;
use std::sync::Arc;

use crate::store::{Reading, ReadingStore, RECENT_EVENTS_LIMIT};

pub struct QueryService {
    store: Arc<dyn ReadingStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    /// The 100 most recent readings, newest first
    pub async fn list_recent(&self) -> MonitorResult<Vec<Reading>> {
        self.store.recent(RECENT_EVENTS_LIMIT).await
    }

    pub async fn total(&self) -> MonitorResult<i64> {
        self.store.count().await
    }
}
