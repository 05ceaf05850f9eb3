//! Process configuration
//!
//! Loaded from a JSON file, with a few environment variables layered on top:
//! - LOOKOUT_CONFIG: Path to the configuration file (default: config.json)
//! - LOOKOUT_HOST: Bind address
//! - LOOKOUT_PORT: Port number
//! - LOOKOUT_DEBUG: Log alerts skipped because nothing is due

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::alerting::{AlertingSettings, ProviderError};
use crate::api::ServerConfig;
use crate::clock::Clock;
use crate::endpoint::{Endpoint, EndpointConfig, EndpointError};
use crate::watchdog::{AlertEvaluator, Monitor, MonitorError};

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub debug: bool,
    /// Absent means alerting is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerting: Option<AlertingSettings>,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load the file named by LOOKOUT_CONFIG and apply env overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var("LOOKOUT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup; unparsable values are ignored
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("LOOKOUT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("LOOKOUT_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(debug) = var("LOOKOUT_DEBUG") {
            self.debug = debug == "true" || debug == "1";
        }
    }

    /// Validate every endpoint and register it in a new monitor
    pub fn build_monitor(&self, clock: Arc<dyn Clock>) -> Result<Monitor, ConfigError> {
        let alerting = self
            .alerting
            .as_ref()
            .map(AlertingSettings::build)
            .transpose()?;
        let mut endpoints = Vec::with_capacity(self.endpoints.len());
        for config in &self.endpoints {
            endpoints.push(Endpoint::from_config(config.clone(), alerting.as_ref())?);
        }

        let monitor = Monitor::new(alerting, AlertEvaluator::new(clock).with_debug(self.debug));
        for endpoint in endpoints {
            monitor.add(endpoint)?;
        }
        Ok(monitor)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("Failed to set up alert provider: {0}")]
    Provider(#[from] ProviderError),
}
