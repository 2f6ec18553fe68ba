//! Layered configuration loading
//!
//! Priority (highest to lowest):
//! 1. Environment variables (`{PREFIX}_SECTION__KEY`)
//! 2. YAML file
//! 3. Struct defaults

use errors::{MonitorError, MonitorResult};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Build the figment used by [`load_layered`]
pub fn layered_figment<T>(defaults: &T, yaml_path: Option<&Path>, env_prefix: &str) -> Figment
where
    T: Serialize,
{
    let mut figment = Figment::from(Serialized::defaults(defaults));

    if let Some(path) = yaml_path {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            figment = figment.merge(Yaml::file(path));
        } else {
            debug!("Config file {} not found, using defaults", path.display());
        }
    }

    figment.merge(Env::prefixed(&format!("{}_", env_prefix.to_uppercase())).split("__"))
}

/// Load configuration: defaults, then YAML file, then environment
pub fn load_layered<T>(yaml_path: Option<&Path>, env_prefix: &str) -> MonitorResult<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    layered_figment(&T::default(), yaml_path, env_prefix)
        .extract()
        .map_err(|e| MonitorError::Configuration(format!("Failed to load configuration: {}", e)))
}
