//! Lookout: Endpoint Alert Lifecycle Engine
//!
//! Decides, for each monitored endpoint, when a notification must go out to
//! an alerting provider and whether it is a new incident, a reminder or a
//! resolution. Check outcomes are produced elsewhere; this crate turns them
//! into a small sequence of dispatches with hysteresis (N failures or
//! successes in a row) and rate-limited reminders.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lookout::alerting::{provider::LogProvider, Alert, AlertingConfig};
//! use lookout::endpoint::{CheckResult, Endpoint};
//! use lookout::watchdog::AlertEvaluator;
//!
//! # async fn run() {
//! let alerting = AlertingConfig::new().with_provider("log", Arc::new(LogProvider::new()));
//! let mut endpoint = Endpoint::new("api").with_alert(Alert::new("log"));
//! endpoint.validate_and_set_defaults(Some(&alerting)).unwrap();
//!
//! let evaluator = AlertEvaluator::default();
//! for _ in 0..3 {
//!     evaluator
//!         .on_outcome(&mut endpoint, &CheckResult::failure(), Some(&alerting))
//!         .await;
//! }
//! # }
//! ```

pub mod alerting;
pub mod api;
pub mod clock;
pub mod config;
pub mod endpoint;
pub mod watchdog;

// Re-export commonly used types
pub use alerting::{Alert, AlertProvider, AlertingConfig};
pub use endpoint::{CheckResult, Endpoint};
pub use watchdog::{AlertEvaluator, Monitor};
