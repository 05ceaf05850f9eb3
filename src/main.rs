//! Lookout Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - LOOKOUT_CONFIG: Path to the JSON configuration (default: config.json)
//! - LOOKOUT_HOST: Bind address (default: 0.0.0.0)
//! - LOOKOUT_PORT: Port number (default: 8080)
//! - LOOKOUT_DEBUG: Log alerts that are not due (default: false)
//! - RUST_LOG: Log level (default: info)
//!
//! Schedulers POST check results to /api/endpoints/:key/results.

use std::sync::Arc;

use lookout::api::run_server;
use lookout::clock::SystemClock;
use lookout::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lookout=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let monitor = Arc::new(config.build_monitor(Arc::new(SystemClock))?);

    tracing::info!("Lookout configuration:");
    tracing::info!("  Host: {}:{}", config.server.host, config.server.port);
    tracing::info!("  Endpoints: {}", monitor.len());
    match monitor.alerting() {
        Some(alerting) => {
            for alert_type in alerting.provider_types() {
                tracing::info!("  Provider: {}", alert_type);
            }
        }
        None => tracing::info!("  Alerting: DISABLED"),
    }
    if config.debug {
        tracing::info!("  Debug: skipped alerts are logged");
    }

    run_server(config.server, monitor).await
}
