//! Shared infrastructure for the sensor monitoring services
//!
//! Provides basic functions shared by all services, including:
//! - logging bootstrap and HTTP access logging
//! - SQLite connection pool construction
//! - layered configuration loading
//! - graceful shutdown handling

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod config_loader;
pub mod logging;
pub mod service_bootstrap;
pub mod shutdown;

pub use config_loader::load_layered;
pub use logging::LogConfig;
pub use service_bootstrap::ServiceInfo;

// Re-export common dependencies
pub use anyhow;
pub use serde;
pub use serde_json;
pub use tokio;
