//! Provider that only writes to the log

use async_trait::async_trait;

use super::{AlertProvider, Notice, ProviderError, Receipt};

/// Emits a tracing event per notification. Never fails.
#[derive(Debug, Default, Clone)]
pub struct LogProvider;

impl LogProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertProvider for LogProvider {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, notice: &Notice<'_>) -> Result<Receipt, ProviderError> {
        let endpoint = notice.endpoint.display_name();
        if notice.resolved {
            tracing::info!(
                endpoint = %endpoint,
                description = %notice.alert.description(),
                "Alert resolved"
            );
        } else {
            tracing::warn!(
                endpoint = %endpoint,
                description = %notice.alert.description(),
                reminder = notice.reminder,
                errors = ?notice.result.errors,
                "Alert triggered"
            );
        }
        Ok(Receipt::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::Alert;
    use crate::endpoint::{CheckResult, Endpoint};

    #[tokio::test]
    async fn test_log_notification() {
        let provider = LogProvider::new();
        let endpoint = Endpoint::new("api");
        let alert = Alert::new("log");
        let result = CheckResult::failure();

        for resolved in [false, true] {
            let notice = Notice {
                endpoint: &endpoint,
                alert: &alert,
                result: &result,
                resolve_key: None,
                resolved,
                reminder: false,
            };
            let receipt = provider.send(&notice).await.unwrap();
            assert_eq!(receipt, Receipt::default());
        }
    }
}
