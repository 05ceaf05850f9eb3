//! Outcome of one health check

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a single check cycle. Only `success` drives alerting; the rest
/// is passed through to providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub success: bool,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl CheckResult {
    pub fn success() -> Self {
        Self::new(true)
    }

    pub fn failure() -> Self {
        Self::new(false)
    }

    fn new(success: bool) -> Self {
        Self {
            success,
            timestamp: Utc::now(),
            errors: Vec::new(),
            hostname: None,
            duration_ms: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }
}
