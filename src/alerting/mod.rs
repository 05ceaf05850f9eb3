//! Alert rules and notification providers
//!
//! An [`Alert`] binds an endpoint to a provider type. Providers are
//! registered in an [`AlertingConfig`] and looked up by that type when an
//! alert has to go out.

pub mod alert;
pub mod config;
pub mod provider;

pub use alert::{Alert, AlertError, AlertKey, AlertType};
pub use config::{AlertingConfig, AlertingSettings};
pub use provider::{AlertProvider, Notice, ProviderError, Receipt};
