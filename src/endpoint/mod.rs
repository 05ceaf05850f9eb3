//! Monitored endpoints and their in-memory alerting state

pub mod result;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerting::{Alert, AlertError, AlertKey, AlertingConfig};

pub use result::CheckResult;

/// Endpoint definition as loaded from configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

/// Runtime state of a single alert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    /// Set once the initial notification went out, cleared on resolve
    pub triggered: bool,
    /// Correlation key handed out by the provider on trigger
    pub resolve_key: Option<String>,
}

/// Runtime state of an endpoint. Nothing here survives a restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointState {
    pub successes_in_a_row: u32,
    pub failures_in_a_row: u32,
    /// Shared by every alert of the endpoint
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub alerts: HashMap<AlertKey, AlertState>,
}

impl EndpointState {
    /// State of one alert, created untriggered on first access
    pub fn alert_mut(&mut self, key: &AlertKey) -> &mut AlertState {
        self.alerts.entry(key.clone()).or_default()
    }

    pub fn alert(&self, key: &AlertKey) -> Option<&AlertState> {
        self.alerts.get(key)
    }

    pub fn is_triggered(&self, key: &AlertKey) -> bool {
        self.alerts.get(key).is_some_and(|s| s.triggered)
    }
}

/// A monitored endpoint: immutable alert rules plus mutable runtime state
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub group: Option<String>,
    pub alerts: Vec<Alert>,
    pub state: EndpointState,
}

impl Endpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            alerts: Vec::new(),
            state: EndpointState::default(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_alert(mut self, alert: Alert) -> Self {
        self.alerts.push(alert);
        self
    }

    /// Build an endpoint from configuration, validating its alerts against
    /// the providers' default alerts
    pub fn from_config(
        config: EndpointConfig,
        alerting: Option<&AlertingConfig>,
    ) -> Result<Self, EndpointError> {
        let mut endpoint = Self {
            name: config.name,
            group: config.group,
            alerts: config.alerts,
            state: EndpointState::default(),
        };
        endpoint.validate_and_set_defaults(alerting)?;
        Ok(endpoint)
    }

    /// Stable identifier, `<group>_<name>` with separators normalized
    pub fn key(&self) -> String {
        let group = self.group.as_deref().unwrap_or_default();
        format!("{}_{}", sanitize(group), sanitize(&self.name))
    }

    pub fn display_name(&self) -> String {
        match self.group.as_deref() {
            Some(group) if !group.is_empty() => format!("{}/{}", group, self.name),
            _ => self.name.clone(),
        }
    }

    pub fn validate_and_set_defaults(
        &mut self,
        alerting: Option<&AlertingConfig>,
    ) -> Result<(), EndpointError> {
        if self.name.trim().is_empty() {
            return Err(EndpointError::MissingName);
        }
        prepare_alerts(&self.name, &mut self.alerts, alerting)
    }

    /// Swap in a new rule set, keeping the state of alerts that survive.
    ///
    /// The rules go through the same defaulting and validation as
    /// [`Endpoint::validate_and_set_defaults`]. On error the endpoint is left
    /// untouched.
    pub fn reconfigure(
        &mut self,
        mut alerts: Vec<Alert>,
        alerting: Option<&AlertingConfig>,
    ) -> Result<(), EndpointError> {
        prepare_alerts(&self.name, &mut alerts, alerting)?;

        let keep: HashSet<AlertKey> = alerts.iter().map(Alert::key).collect();
        self.state.alerts.retain(|key, _| keep.contains(key));
        self.alerts = alerts;
        Ok(())
    }

    /// Whether any enabled alert is currently triggered
    pub fn has_triggered_alert(&self) -> bool {
        self.alerts
            .iter()
            .any(|a| a.is_enabled() && self.state.is_triggered(&a.key()))
    }
}

/// Apply provider defaults, validate every rule and reject duplicate keys
fn prepare_alerts(
    endpoint: &str,
    alerts: &mut [Alert],
    alerting: Option<&AlertingConfig>,
) -> Result<(), EndpointError> {
    let mut seen = HashSet::new();
    for alert in alerts.iter_mut() {
        if let Some(default) = alerting.and_then(|a| a.default_alert_for(&alert.alert_type)) {
            alert.apply_default(default);
        }
        alert
            .validate_and_set_defaults()
            .map_err(|source| EndpointError::Alert {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let key = alert.key();
        if !seen.insert(key.clone()) {
            return Err(EndpointError::DuplicateAlert {
                endpoint: endpoint.to_string(),
                alert: key.to_string(),
            });
        }
    }
    Ok(())
}

fn sanitize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '/' | '_' | ',' | '.' | '#' | ' ' => '-',
            other => other,
        })
        .collect()
}

/// Endpoint configuration errors
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("endpoint name is required")]
    MissingName,

    #[error("endpoint {endpoint} has a duplicate alert: {alert}")]
    DuplicateAlert { endpoint: String, alert: String },

    #[error("invalid alert on endpoint {endpoint}: {source}")]
    Alert {
        endpoint: String,
        #[source]
        source: AlertError,
    },
}
