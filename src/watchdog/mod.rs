//! Alert lifecycle: deciding when to trigger, remind and resolve
//!
//! The [`AlertEvaluator`] is driven once per check cycle with the endpoint's
//! latest [`CheckResult`](crate::endpoint::CheckResult). The [`Monitor`]
//! owns the endpoints and makes sure cycles for the same endpoint never
//! overlap.

pub mod evaluator;
pub mod monitor;

pub use evaluator::{AlertEvaluator, Dispatch, DispatchKind, DispatchOutcome, Evaluation};
pub use monitor::{AlertStatus, EndpointStatus, Monitor, MonitorError, Recorded};
