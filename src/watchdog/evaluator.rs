//! Alert lifecycle evaluation
//!
//! Turns a stream of check outcomes into trigger, reminder and resolve
//! notifications. Trigger-side delivery failures leave state untouched so the
//! same send is retried on the next failing check. Resolve-side failures are
//! logged only: the alert is resolved locally before the send is attempted,
//! so a provider that keeps erroring cannot pin an alert in the triggered
//! state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alerting::{Alert, AlertKey, AlertingConfig, Notice};
use crate::clock::{Clock, SystemClock};
use crate::endpoint::{CheckResult, Endpoint};

/// What kind of notification was due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    Initial,
    Reminder,
    Resolved,
}

/// How a due notification ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent,
    Failed(String),
    /// No provider registered for the alert type
    NoProvider,
    /// Resolved without a message since send-on-resolved is off
    Silent,
}

/// One notification decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispatch {
    pub alert: AlertKey,
    pub kind: DispatchKind,
    pub outcome: DispatchOutcome,
}

/// Notification decisions made for one check outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub dispatches: Vec<Dispatch>,
}

impl Evaluation {
    fn record(&mut self, alert: AlertKey, kind: DispatchKind, outcome: DispatchOutcome) {
        self.dispatches.push(Dispatch {
            alert,
            kind,
            outcome,
        });
    }

    /// Number of notifications delivered
    pub fn sent(&self) -> usize {
        self.dispatches
            .iter()
            .filter(|d| d.outcome == DispatchOutcome::Sent)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatches.is_empty()
    }
}

/// Decides, for each alert of an endpoint, whether to trigger, remind or
/// resolve after a check outcome.
///
/// Calls for the same endpoint must be serialized; the `&mut Endpoint`
/// receiver enforces that. Distinct endpoints are independent.
pub struct AlertEvaluator {
    clock: Arc<dyn Clock>,
    debug: bool,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl AlertEvaluator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            debug: false,
        }
    }

    /// Log alerts skipped because nothing is due
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Process one check outcome. Does nothing when alerting is disabled.
    ///
    /// Provider errors never escape; they are logged and reported in the
    /// returned [`Evaluation`].
    pub async fn on_outcome(
        &self,
        endpoint: &mut Endpoint,
        result: &CheckResult,
        alerting: Option<&AlertingConfig>,
    ) -> Evaluation {
        let Some(alerting) = alerting else {
            return Evaluation::default();
        };
        if result.success {
            self.handle_alerts_to_resolve(endpoint, result, alerting).await
        } else {
            self.handle_alerts_to_trigger(endpoint, result, alerting).await
        }
    }

    async fn handle_alerts_to_trigger(
        &self,
        endpoint: &mut Endpoint,
        result: &CheckResult,
        alerting: &AlertingConfig,
    ) -> Evaluation {
        let mut evaluation = Evaluation::default();
        endpoint.state.successes_in_a_row = 0;
        endpoint.state.failures_in_a_row = endpoint.state.failures_in_a_row.saturating_add(1);

        for alert in &endpoint.alerts {
            if !alert.is_enabled() || !alert.is_due_to_trigger(endpoint.state.failures_in_a_row) {
                continue;
            }

            let key = alert.key();
            let triggered = endpoint.state.is_triggered(&key);
            let send_initial = !triggered;
            let send_reminder =
                triggered && self.is_reminder_due(alert, endpoint.state.last_reminder_sent);
            if !send_initial && !send_reminder {
                if self.debug {
                    tracing::debug!(
                        endpoint = %endpoint.name,
                        description = %alert.description(),
                        "Alert is not due for triggering or reminding, skipping"
                    );
                }
                continue;
            }
            let kind = if send_initial {
                DispatchKind::Initial
            } else {
                DispatchKind::Reminder
            };

            let Some(provider) = alerting.provider_for(&alert.alert_type) else {
                tracing::warn!(
                    endpoint = %endpoint.name,
                    alert_type = %alert.alert_type,
                    "Not sending alert despite being TRIGGERED, because the provider wasn't configured properly"
                );
                evaluation.record(key, kind, DispatchOutcome::NoProvider);
                continue;
            };

            tracing::info!(
                endpoint = %endpoint.name,
                alert_type = %alert.alert_type,
                description = %alert.description(),
                reminder = send_reminder,
                "Sending alert because it has been TRIGGERED"
            );
            let resolve_key = endpoint
                .state
                .alert(&key)
                .and_then(|s| s.resolve_key.clone());
            let sent = {
                let notice = Notice {
                    endpoint: &*endpoint,
                    alert,
                    result,
                    resolve_key: resolve_key.as_deref(),
                    resolved: false,
                    reminder: send_reminder,
                };
                provider.send(&notice).await
            };

            match sent {
                Ok(receipt) => {
                    let state = endpoint.state.alert_mut(&key);
                    if send_initial {
                        state.triggered = true;
                    }
                    if receipt.resolve_key.is_some() {
                        state.resolve_key = receipt.resolve_key;
                    }
                    // Initial sends also start the reminder interval
                    endpoint.state.last_reminder_sent = Some(self.clock.now());
                    evaluation.record(key, kind, DispatchOutcome::Sent);
                }
                Err(e) => {
                    // State is left as is so the next failing check retries
                    tracing::error!(
                        endpoint = %endpoint.name,
                        provider = %provider.name(),
                        description = %alert.description(),
                        error = %e,
                        "Failed to send an alert"
                    );
                    evaluation.record(key, kind, DispatchOutcome::Failed(e.to_string()));
                }
            }
        }

        evaluation
    }

    async fn handle_alerts_to_resolve(
        &self,
        endpoint: &mut Endpoint,
        result: &CheckResult,
        alerting: &AlertingConfig,
    ) -> Evaluation {
        let mut evaluation = Evaluation::default();
        endpoint.state.successes_in_a_row = endpoint.state.successes_in_a_row.saturating_add(1);

        for alert in &endpoint.alerts {
            let key = alert.key();
            if !alert.is_enabled()
                || !endpoint.state.is_triggered(&key)
                || !alert.is_due_to_resolve(endpoint.state.successes_in_a_row)
            {
                continue;
            }

            // Resolved locally even if the notification below fails
            let resolve_key = {
                let state = endpoint.state.alert_mut(&key);
                state.triggered = false;
                state.resolve_key.take()
            };

            if !alert.is_sending_on_resolved() {
                evaluation.record(key, DispatchKind::Resolved, DispatchOutcome::Silent);
                continue;
            }

            let Some(provider) = alerting.provider_for(&alert.alert_type) else {
                tracing::warn!(
                    endpoint = %endpoint.name,
                    alert_type = %alert.alert_type,
                    "Not sending alert despite being RESOLVED, because the provider wasn't configured properly"
                );
                evaluation.record(key, DispatchKind::Resolved, DispatchOutcome::NoProvider);
                continue;
            };

            tracing::info!(
                endpoint = %endpoint.name,
                alert_type = %alert.alert_type,
                description = %alert.description(),
                "Sending alert because it has been RESOLVED"
            );
            let sent = {
                let notice = Notice {
                    endpoint: &*endpoint,
                    alert,
                    result,
                    resolve_key: resolve_key.as_deref(),
                    resolved: true,
                    reminder: false,
                };
                provider.send(&notice).await
            };

            let outcome = match sent {
                Ok(_) => DispatchOutcome::Sent,
                Err(e) => {
                    tracing::error!(
                        endpoint = %endpoint.name,
                        provider = %provider.name(),
                        description = %alert.description(),
                        error = %e,
                        "Failed to send a resolved alert"
                    );
                    DispatchOutcome::Failed(e.to_string())
                }
            };
            evaluation.record(key, DispatchKind::Resolved, outcome);
        }

        endpoint.state.failures_in_a_row = 0;
        evaluation
    }

    fn is_reminder_due(&self, alert: &Alert, last_reminder_sent: Option<DateTime<Utc>>) -> bool {
        if alert.minimum_repeat_interval.is_zero() {
            return false;
        }
        let Some(last) = last_reminder_sent else {
            return true;
        };
        // Negative elapsed time (clock moved backwards) is never due
        (self.clock.now() - last)
            .to_std()
            .map(|elapsed| elapsed >= alert.minimum_repeat_interval)
            .unwrap_or(false)
    }
}
