//! Service bootstrap utilities
//!
//! Startup banner and logging initialization shared by all services.

use crate::logging::{self, LogConfig};
use tracing::info;

/// Service metadata for startup
pub struct ServiceInfo {
    /// Service name (e.g., "sensorsrv")
    pub name: String,
    /// Service version
    pub version: String,
    /// Service description
    pub description: String,
    /// Default port
    pub default_port: u16,
}

impl ServiceInfo {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        default_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            default_port,
        }
    }

    /// Log config for this service with the given level and sinks
    pub fn log_config(
        &self,
        level: &str,
        enable_json: bool,
        log_dir: Option<std::path::PathBuf>,
    ) -> LogConfig {
        LogConfig {
            service_name: self.name.clone(),
            level: level.to_string(),
            enable_json,
            log_dir,
        }
    }
}

/// Print startup banner
pub fn print_startup_banner(service: &ServiceInfo) {
    info!("==================================================");
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    info!(" Default Port: {}", service.default_port);
    info!("==================================================");
}

/// Initialize logging and print the banner
pub fn init_logging(service: &ServiceInfo, config: &LogConfig) -> anyhow::Result<()> {
    logging::init_with_config(config)?;
    print_startup_banner(service);
    Ok(())
}
