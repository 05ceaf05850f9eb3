//! Notification providers

pub mod log;
pub mod webhook;

use async_trait::async_trait;

use super::alert::Alert;
use crate::endpoint::{CheckResult, Endpoint};

pub use self::log::LogProvider;
pub use webhook::WebhookProvider;

/// Everything a provider needs to format one message
#[derive(Debug, Clone, Copy)]
pub struct Notice<'a> {
    pub endpoint: &'a Endpoint,
    pub alert: &'a Alert,
    pub result: &'a CheckResult,
    /// Key handed out by this provider when the alert was triggered
    pub resolve_key: Option<&'a str>,
    pub resolved: bool,
    /// Repeated notification for an alert that is already triggered
    pub reminder: bool,
}

/// What a provider reports back after a successful delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    /// Correlation key to present again when resolving
    pub resolve_key: Option<String>,
}

/// A notification channel.
///
/// `send` is awaited inline by the evaluator, which only updates alert state
/// once it returns. Timeouts are the provider's concern.
#[async_trait]
pub trait AlertProvider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn send(&self, notice: &Notice<'_>) -> Result<Receipt, ProviderError>;
}

/// Delivery errors
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}
