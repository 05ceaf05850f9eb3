//! Provider registry and provider settings

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::alert::{Alert, AlertType};
use super::provider::{AlertProvider, LogProvider, ProviderError, WebhookProvider};

/// Upper bound on a single webhook request when none is configured
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Registered providers, looked up by alert type.
///
/// Its absence means alerting is disabled for the whole process.
#[derive(Clone, Default)]
pub struct AlertingConfig {
    providers: HashMap<AlertType, Arc<dyn AlertProvider>>,
    defaults: HashMap<AlertType, Alert>,
}

impl AlertingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous one for the same type
    pub fn register(&mut self, alert_type: AlertType, provider: Arc<dyn AlertProvider>) {
        self.providers.insert(alert_type, provider);
    }

    pub fn with_provider(
        mut self,
        alert_type: impl Into<AlertType>,
        provider: Arc<dyn AlertProvider>,
    ) -> Self {
        self.register(alert_type.into(), provider);
        self
    }

    /// Default alert merged into every alert of this type at load time
    pub fn set_default_alert(&mut self, alert_type: AlertType, default: Alert) {
        self.defaults.insert(alert_type, default);
    }

    pub fn provider_for(&self, alert_type: &AlertType) -> Option<Arc<dyn AlertProvider>> {
        self.providers.get(alert_type).cloned()
    }

    pub fn default_alert_for(&self, alert_type: &AlertType) -> Option<&Alert> {
        self.defaults.get(alert_type)
    }

    pub fn provider_types(&self) -> Vec<&AlertType> {
        let mut types: Vec<_> = self.providers.keys().collect();
        types.sort();
        types
    }
}

impl fmt::Debug for AlertingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertingConfig")
            .field("providers", &self.provider_types())
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Provider section of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AlertingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LogSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_alert: Option<Alert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WebhookSettings {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Request timeout, e.g. `"10s"` or `"500ms"`
    #[serde(default = "default_webhook_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_alert: Option<Alert>,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            headers: HashMap::new(),
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
            default_alert: None,
        }
    }
}

fn default_webhook_timeout() -> Duration {
    DEFAULT_WEBHOOK_TIMEOUT
}

impl AlertingSettings {
    /// Instantiate the configured providers
    pub fn build(&self) -> Result<AlertingConfig, ProviderError> {
        let mut config = AlertingConfig::new();

        if let Some(log) = &self.log {
            let alert_type = AlertType::new("log");
            config.register(alert_type.clone(), Arc::new(LogProvider::new()));
            if let Some(default) = &log.default_alert {
                config.set_default_alert(alert_type, default.clone());
            }
        }

        if let Some(webhook) = &self.webhook {
            if webhook.url.trim().is_empty() {
                tracing::warn!("Webhook provider has no url, not registering it");
            } else {
                let alert_type = AlertType::new("webhook");
                let provider =
                    WebhookProvider::new(&webhook.url, webhook.headers.clone(), webhook.timeout)?;
                config.register(alert_type.clone(), Arc::new(provider));
                if let Some(default) = &webhook.default_alert {
                    config.set_default_alert(alert_type, default.clone());
                }
            }
        }

        Ok(config)
    }
}
