//! Alert rule configuration

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Consecutive failures needed before an alert fires, when unset
pub const DEFAULT_FAILURE_THRESHOLD: i32 = 3;
/// Consecutive successes needed before a triggered alert resolves, when unset
pub const DEFAULT_SUCCESS_THRESHOLD: i32 = 2;

/// Identifies which provider handles an alert
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertType(String);

impl AlertType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlertType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Alert rule binding an endpoint to a notification provider.
///
/// `enabled`, `send_on_resolved` and `description` are optional so that a
/// provider's default alert can tell "unset" apart from an explicit value.
/// Runtime state lives in [`AlertState`](crate::endpoint::AlertState).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Alert {
    /// Provider type
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Failures in a row before triggering
    #[serde(default)]
    pub failure_threshold: i32,
    /// Successes in a row before an ongoing incident resolves
    #[serde(default)]
    pub success_threshold: i32,
    /// Included in outgoing messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_on_resolved: Option<bool>,
    /// Interval between reminders, zero disables them
    #[serde(default, with = "duration_serde")]
    pub minimum_repeat_interval: Duration,
}

impl Alert {
    /// Create an alert for a provider type with every optional field unset
    pub fn new(alert_type: impl Into<AlertType>) -> Self {
        Self {
            alert_type: alert_type.into(),
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_failure_threshold(mut self, threshold: i32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_success_threshold(mut self, threshold: i32) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_send_on_resolved(mut self, send_on_resolved: bool) -> Self {
        self.send_on_resolved = Some(send_on_resolved);
        self
    }

    pub fn with_minimum_repeat_interval(mut self, interval: Duration) -> Self {
        self.minimum_repeat_interval = interval;
        self
    }

    /// Fill fields left unset from a provider's default alert.
    ///
    /// Must run before [`Alert::validate_and_set_defaults`], otherwise the
    /// built-in thresholds would shadow the provider's.
    pub fn apply_default(&mut self, default: &Alert) {
        if self.enabled.is_none() {
            self.enabled = default.enabled;
        }
        if self.send_on_resolved.is_none() {
            self.send_on_resolved = default.send_on_resolved;
        }
        if self.description.is_none() {
            self.description = default.description.clone();
        }
        if self.failure_threshold == 0 {
            self.failure_threshold = default.failure_threshold;
        }
        if self.success_threshold == 0 {
            self.success_threshold = default.success_threshold;
        }
        if self.minimum_repeat_interval.is_zero() {
            self.minimum_repeat_interval = default.minimum_repeat_interval;
        }
    }

    /// Apply threshold defaults and validate the rule.
    ///
    /// Only non-positive thresholds are overwritten, so calling this again on
    /// an already defaulted alert changes nothing.
    pub fn validate_and_set_defaults(&mut self) -> Result<(), AlertError> {
        if self.failure_threshold <= 0 {
            self.failure_threshold = DEFAULT_FAILURE_THRESHOLD;
        }
        if self.success_threshold <= 0 {
            self.success_threshold = DEFAULT_SUCCESS_THRESHOLD;
        }
        if self.alert_type.is_empty() {
            return Err(AlertError::MissingType);
        }
        // Quotes and backslashes break templated provider payloads
        if self.description().contains(['"', '\\']) {
            return Err(AlertError::InvalidDescription);
        }
        Ok(())
    }

    /// Unset means enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Unset means no resolution notification
    pub fn is_sending_on_resolved(&self) -> bool {
        self.send_on_resolved.unwrap_or(false)
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Whether a failure streak of `streak` reaches the failure threshold
    pub fn is_due_to_trigger(&self, streak: u32) -> bool {
        i64::from(self.failure_threshold) <= i64::from(streak)
    }

    /// Whether a success streak of `streak` reaches the success threshold
    pub fn is_due_to_resolve(&self, streak: u32) -> bool {
        i64::from(self.success_threshold) <= i64::from(streak)
    }

    /// Identity used to key runtime state across configuration reloads
    pub fn key(&self) -> AlertKey {
        AlertKey {
            alert_type: self.alert_type.clone(),
            description: self.description().to_string(),
        }
    }
}

/// Identity of an alert within one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlertKey {
    pub alert_type: AlertType,
    pub description: String,
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.alert_type)
        } else {
            write!(f, "{} ({})", self.alert_type, self.description)
        }
    }
}

/// Alert validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    #[error("alert description must not have \" or \\")]
    InvalidDescription,

    #[error("alert type is required")]
    MissingType,
}

/// Repeat interval serialization: integer seconds or humantime strings such
/// as `"500ms"`, `"10m"`, `"1h 30m"`
mod duration_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DurationRepr {
        Secs(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match DurationRepr::deserialize(deserializer)? {
            DurationRepr::Secs(secs) => Ok(Duration::from_secs(secs)),
            DurationRepr::Text(text) => {
                humantime::parse_duration(text.trim()).map_err(D::Error::custom)
            }
        }
    }
}
