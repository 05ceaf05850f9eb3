//! Generic JSON webhook provider

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::{AlertProvider, Notice, ProviderError, Receipt};

/// POSTs a JSON document describing the notification
pub struct WebhookProvider {
    client: reqwest::Client,
    url: String,
    headers: HashMap<String, String>,
}

impl WebhookProvider {
    /// `timeout` bounds the whole request, connect through body
    pub fn new(
        url: impl Into<String>,
        headers: HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            headers,
        })
    }

    /// Build the request body
    fn payload(notice: &Notice<'_>, resolve_key: &str) -> serde_json::Value {
        serde_json::json!({
            "endpoint": notice.endpoint.name,
            "group": notice.endpoint.group,
            "key": notice.endpoint.key(),
            "alert_type": notice.alert.alert_type,
            "description": notice.alert.description(),
            "resolved": notice.resolved,
            "reminder": notice.reminder,
            "success": notice.result.success,
            "errors": notice.result.errors,
            "resolve_key": resolve_key,
            "timestamp": notice.result.timestamp.to_rfc3339(),
        })
    }

    fn resolve_key(notice: &Notice<'_>) -> String {
        match notice.resolve_key {
            Some(key) => key.to_string(),
            None => format!("{}:{}", notice.endpoint.key(), notice.alert.alert_type),
        }
    }
}

#[async_trait]
impl AlertProvider for WebhookProvider {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, notice: &Notice<'_>) -> Result<Receipt, ProviderError> {
        let resolve_key = Self::resolve_key(notice);
        let mut request = self
            .client
            .post(&self.url)
            .json(&Self::payload(notice, &resolve_key));

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        tracing::debug!(
            endpoint = %notice.endpoint.name,
            url = %self.url,
            resolved = notice.resolved,
            "Webhook notification sent"
        );

        Ok(Receipt {
            resolve_key: (!notice.resolved).then_some(resolve_key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::Alert;
    use crate::endpoint::{CheckResult, Endpoint};
    use tokio::net::TcpListener;

    #[test]
    fn test_payload_and_resolve_key() {
        let endpoint = Endpoint::new("API").with_group("core");
        let alert = Alert::new("webhook").with_description("api down");
        let result = CheckResult::failure().with_error("timeout");
        let notice = Notice {
            endpoint: &endpoint,
            alert: &alert,
            result: &result,
            resolve_key: None,
            resolved: false,
            reminder: true,
        };

        let key = WebhookProvider::resolve_key(&notice);
        assert_eq!(key, "core_api:webhook");

        let payload = WebhookProvider::payload(&notice, &key);
        assert_eq!(payload["endpoint"], "API");
        assert_eq!(payload["group"], "core");
        assert_eq!(payload["description"], "api down");
        assert_eq!(payload["reminder"], true);
        assert_eq!(payload["errors"][0], "timeout");
        assert_eq!(payload["resolve_key"], "core_api:webhook");

        let resolving = Notice {
            resolve_key: Some("abc"),
            resolved: true,
            reminder: false,
            ..notice
        };
        assert_eq!(WebhookProvider::resolve_key(&resolving), "abc");
    }

    #[tokio::test]
    async fn test_unreachable_webhook_errors() {
        let provider = WebhookProvider::new(
            "http://127.0.0.1:1/hook",
            HashMap::new(),
            Duration::from_secs(5),
        )
        .unwrap();
        let endpoint = Endpoint::new("api");
        let alert = Alert::new("webhook");
        let result = CheckResult::failure();
        let notice = Notice {
            endpoint: &endpoint,
            alert: &alert,
            result: &result,
            resolve_key: None,
            resolved: false,
            reminder: false,
        };

        assert!(matches!(
            provider.send(&notice).await,
            Err(ProviderError::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_silent_webhook_times_out() {
        // Accepts connections and never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = WebhookProvider::new(
            format!("http://{}/hook", addr),
            HashMap::new(),
            Duration::from_millis(200),
        )
        .unwrap();
        let endpoint = Endpoint::new("api");
        let alert = Alert::new("webhook");
        let result = CheckResult::failure();
        let notice = Notice {
            endpoint: &endpoint,
            alert: &alert,
            result: &result,
            resolve_key: None,
            resolved: false,
            reminder: false,
        };

        let outcome = tokio::time::timeout(Duration::from_secs(5), provider.send(&notice))
            .await
            .expect("send should give up on its own");
        match outcome {
            Err(ProviderError::Http(e)) => assert!(e.is_timeout(), "{}", e),
            other => panic!("expected a timeout, got {:?}", other),
        }
    }
}
