//! Endpoint registry with per-endpoint serialized evaluation

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use super::evaluator::{AlertEvaluator, Evaluation};
use crate::alerting::{Alert, AlertType, AlertingConfig};
use crate::endpoint::{CheckResult, Endpoint, EndpointError};

/// Holds every monitored endpoint.
///
/// Each endpoint sits behind its own async mutex, so check cycles for one
/// endpoint run one at a time while different endpoints proceed in parallel.
pub struct Monitor {
    endpoints: DashMap<String, Arc<Mutex<Endpoint>>>,
    alerting: Option<Arc<AlertingConfig>>,
    evaluator: AlertEvaluator,
}

impl Monitor {
    pub fn new(alerting: Option<AlertingConfig>, evaluator: AlertEvaluator) -> Self {
        Self {
            endpoints: DashMap::new(),
            alerting: alerting.map(Arc::new),
            evaluator,
        }
    }

    pub fn alerting(&self) -> Option<&AlertingConfig> {
        self.alerting.as_deref()
    }

    /// Register an endpoint under its key
    pub fn add(&self, endpoint: Endpoint) -> Result<String, MonitorError> {
        let key = endpoint.key();
        match self.endpoints.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(MonitorError::DuplicateEndpoint(key)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(endpoint)));
                Ok(key)
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.endpoints.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Registered endpoint keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.endpoints.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    fn endpoint(&self, key: &str) -> Result<Arc<Mutex<Endpoint>>, MonitorError> {
        self.endpoints
            .get(key)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| MonitorError::UnknownEndpoint(key.to_string()))
    }

    /// Feed one check outcome for an endpoint through the evaluator
    pub async fn record(&self, key: &str, result: &CheckResult) -> Result<Recorded, MonitorError> {
        let endpoint = self.endpoint(key)?;
        let mut endpoint = endpoint.lock().await;

        let evaluation = self
            .evaluator
            .on_outcome(&mut endpoint, result, self.alerting.as_deref())
            .await;

        tracing::debug!(
            endpoint = %key,
            success = result.success,
            dispatches = evaluation.dispatches.len(),
            "Recorded check result"
        );

        Ok(Recorded {
            status: EndpointStatus::from(&*endpoint),
            evaluation,
        })
    }

    /// Replace an endpoint's alert rules, keeping state for unchanged alerts.
    ///
    /// The rules are defaulted and validated against the registered providers
    /// first. A rejected rule set leaves the endpoint as it was.
    pub async fn reconfigure(
        &self,
        key: &str,
        alerts: Vec<Alert>,
    ) -> Result<EndpointStatus, MonitorError> {
        let endpoint = self.endpoint(key)?;
        let mut endpoint = endpoint.lock().await;
        endpoint.reconfigure(alerts, self.alerting.as_deref())?;

        tracing::info!(
            endpoint = %key,
            alerts = endpoint.alerts.len(),
            "Reconfigured alert rules"
        );
        Ok(EndpointStatus::from(&*endpoint))
    }

    pub async fn status(&self, key: &str) -> Result<EndpointStatus, MonitorError> {
        let endpoint = self.endpoint(key)?;
        let endpoint = endpoint.lock().await;
        Ok(EndpointStatus::from(&*endpoint))
    }

    /// Snapshot of every endpoint, sorted by key
    pub async fn statuses(&self) -> Vec<EndpointStatus> {
        let endpoints: Vec<_> = self
            .endpoints
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();

        let mut statuses = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            statuses.push(EndpointStatus::from(&*endpoint.lock().await));
        }
        statuses.sort_by(|a, b| a.key.cmp(&b.key));
        statuses
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("endpoints", &self.keys())
            .field("alerting", &self.alerting)
            .finish_non_exhaustive()
    }
}

/// Outcome of recording a check result
#[derive(Debug, Clone, Serialize)]
pub struct Recorded {
    pub status: EndpointStatus,
    pub evaluation: Evaluation,
}

/// Point-in-time view of an endpoint's alerting state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStatus {
    pub key: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub successes_in_a_row: u32,
    pub failures_in_a_row: u32,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    /// Any enabled alert currently triggered
    pub triggered: bool,
    pub alerts: Vec<AlertStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertStatus {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub description: String,
    pub enabled: bool,
    pub triggered: bool,
}

impl From<&Endpoint> for EndpointStatus {
    fn from(endpoint: &Endpoint) -> Self {
        Self {
            key: endpoint.key(),
            name: endpoint.name.clone(),
            group: endpoint.group.clone(),
            successes_in_a_row: endpoint.state.successes_in_a_row,
            failures_in_a_row: endpoint.state.failures_in_a_row,
            last_reminder_sent: endpoint.state.last_reminder_sent,
            triggered: endpoint.has_triggered_alert(),
            alerts: endpoint
                .alerts
                .iter()
                .map(|alert| AlertStatus {
                    alert_type: alert.alert_type.clone(),
                    description: alert.description().to_string(),
                    enabled: alert.is_enabled(),
                    triggered: endpoint.state.is_triggered(&alert.key()),
                })
                .collect(),
        }
    }
}

/// Monitor errors
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Endpoint already registered: {0}")]
    DuplicateEndpoint(String),

    #[error(transparent)]
    InvalidEndpoint(#[from] EndpointError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::provider::LogProvider;
    use crate::alerting::{AlertProvider, Notice, ProviderError, Receipt};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Slow provider counting concurrent calls
    #[derive(Default)]
    struct SlowProvider {
        sends: AtomicUsize,
    }

    #[async_trait]
    impl AlertProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn send(&self, _notice: &Notice<'_>) -> Result<Receipt, ProviderError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(Receipt::default())
        }
    }

    fn endpoint(name: &str, alert_type: &str) -> Endpoint {
        let mut endpoint = Endpoint::new(name)
            .with_alert(Alert::new(alert_type).with_failure_threshold(1));
        endpoint.validate_and_set_defaults(None).unwrap();
        endpoint
    }

    #[tokio::test]
    async fn test_record_and_status() {
        let alerting = AlertingConfig::new().with_provider("log", Arc::new(LogProvider::new()));
        let monitor = Monitor::new(Some(alerting), AlertEvaluator::default());
        let key = monitor.add(endpoint("api", "log")).unwrap();
        assert_eq!(key, "_api");

        let recorded = monitor.record(&key, &CheckResult::failure()).await.unwrap();
        assert_eq!(recorded.evaluation.sent(), 1);
        assert_eq!(recorded.status.failures_in_a_row, 1);
        assert!(recorded.status.triggered);
        assert!(recorded.status.alerts[0].triggered);
        assert!(recorded.status.last_reminder_sent.is_some());

        let status = monitor.status(&key).await.unwrap();
        assert_eq!(status, recorded.status);
    }

    #[tokio::test]
    async fn test_unknown_and_duplicate_endpoint() {
        let monitor = Monitor::new(None, AlertEvaluator::default());
        assert!(matches!(
            monitor.record("nope", &CheckResult::success()).await,
            Err(MonitorError::UnknownEndpoint(_))
        ));

        monitor.add(endpoint("api", "log")).unwrap();
        assert!(matches!(
            monitor.add(endpoint("api", "log")),
            Err(MonitorError::DuplicateEndpoint(_))
        ));
        assert_eq!(monitor.len(), 1);
        assert!(monitor.remove("_api"));
        assert!(monitor.is_empty());
    }

    #[tokio::test]
    async fn test_same_endpoint_is_serialized() {
        let provider = Arc::new(SlowProvider::default());
        let alerting = AlertingConfig::new().with_provider("slow", provider.clone());
        let monitor = Arc::new(Monitor::new(Some(alerting), AlertEvaluator::default()));
        let key = monitor.add(endpoint("api", "slow")).unwrap();

        let result = CheckResult::failure();
        let calls = (0..10).map(|_| monitor.record(&key, &result));
        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let status = monitor.status(&key).await.unwrap();
        assert_eq!(status.failures_in_a_row, 10);
        assert_eq!(provider.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_endpoints_are_independent() {
        let provider = Arc::new(SlowProvider::default());
        let alerting = AlertingConfig::new().with_provider("slow", provider.clone());
        let monitor = Arc::new(Monitor::new(Some(alerting), AlertEvaluator::default()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let key = monitor.add(endpoint(&format!("svc-{}", i), "slow")).unwrap();
            let monitor = Arc::clone(&monitor);
            handles.push(tokio::spawn(async move {
                monitor.record(&key, &CheckResult::failure()).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(provider.sends.load(Ordering::SeqCst), 4);
        let statuses = monitor.statuses().await;
        assert_eq!(statuses.len(), 4);
        assert!(statuses.iter().all(|s| s.alerts[0].triggered));
        assert_eq!(statuses[0].key, "_svc-0");
    }

    #[tokio::test]
    async fn test_reconfigure_keeps_trigger_state() {
        let alerting = AlertingConfig::new().with_provider("log", Arc::new(LogProvider::new()));
        let monitor = Monitor::new(Some(alerting), AlertEvaluator::default());
        let key = monitor.add(endpoint("api", "log")).unwrap();
        monitor.record(&key, &CheckResult::failure()).await.unwrap();

        let reloaded = Alert::new("log").with_failure_threshold(1).with_success_threshold(5);
        let status = monitor.reconfigure(&key, vec![reloaded]).await.unwrap();
        assert!(status.triggered);
        assert!(status.alerts[0].triggered);
        assert_eq!(status.failures_in_a_row, 1);

        // Resolution now waits for five successes
        for _ in 0..4 {
            monitor.record(&key, &CheckResult::success()).await.unwrap();
        }
        assert!(monitor.status(&key).await.unwrap().triggered);
        monitor.record(&key, &CheckResult::success()).await.unwrap();
        assert!(!monitor.status(&key).await.unwrap().triggered);
    }

    #[tokio::test]
    async fn test_rejected_reconfigure_keeps_rules_and_state() {
        let provider = Arc::new(SlowProvider::default());
        let alerting = AlertingConfig::new().with_provider("slow", provider.clone());
        let monitor = Monitor::new(Some(alerting), AlertEvaluator::default());
        let mut original = Endpoint::new("api")
            .with_alert(Alert::new("slow").with_failure_threshold(2));
        original.validate_and_set_defaults(None).unwrap();
        let key = monitor.add(original).unwrap();
        monitor.record(&key, &CheckResult::failure()).await.unwrap();
        let before = monitor.status(&key).await.unwrap();

        let bad = Alert::new("slow").with_description("a\"b");
        let err = monitor
            .reconfigure(&key, vec![bad.clone(), bad])
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::InvalidEndpoint(_)));
        assert_eq!(monitor.status(&key).await.unwrap(), before);

        // Old threshold of two still applies: the second failure triggers
        let recorded = monitor.record(&key, &CheckResult::failure()).await.unwrap();
        assert_eq!(recorded.evaluation.sent(), 1);
        assert!(recorded.status.triggered);
        assert_eq!(provider.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reconfigure_fills_unset_thresholds() {
        let provider = Arc::new(SlowProvider::default());
        let alerting = AlertingConfig::new().with_provider("slow", provider.clone());
        let monitor = Monitor::new(Some(alerting), AlertEvaluator::default());
        let key = monitor.add(endpoint("api", "slow")).unwrap();

        monitor
            .reconfigure(&key, vec![Alert::new("slow")])
            .await
            .unwrap();

        // Threshold 0 became the default of three
        for _ in 0..2 {
            let recorded = monitor.record(&key, &CheckResult::failure()).await.unwrap();
            assert!(recorded.evaluation.is_empty());
        }
        let recorded = monitor.record(&key, &CheckResult::failure()).await.unwrap();
        assert_eq!(recorded.evaluation.sent(), 1);
        assert_eq!(provider.sends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_lists_endpoint_keys() {
        let monitor = Monitor::new(None, AlertEvaluator::default());
        monitor.add(endpoint("web", "log")).unwrap();
        monitor.add(endpoint("api", "log")).unwrap();
        let debug = format!("{:?}", monitor);
        assert!(debug.contains(r#"endpoints: ["_api", "_web"]"#), "{}", debug);
        assert!(debug.contains("alerting: None"), "{}", debug);
    }
}
