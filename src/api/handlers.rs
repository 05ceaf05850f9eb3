//! HTTP handlers for endpoint status, check result ingestion and rule reloads

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::alerting::Alert;
use crate::endpoint::CheckResult;
use crate::watchdog::{EndpointStatus, Monitor, MonitorError, Recorded};

/// Application state shared across handlers
pub struct AppState {
    pub monitor: Arc<Monitor>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub alerting: bool,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        alerting: state.monitor.alerting().is_some(),
    })
}

// ============================================================================
// Endpoints
// ============================================================================

pub async fn list_endpoints(State(state): State<Arc<AppState>>) -> Json<Vec<EndpointStatus>> {
    Json(state.monitor.statuses().await)
}

pub async fn endpoint_status(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<EndpointStatus>, ApiError> {
    Ok(Json(state.monitor.status(&key).await?))
}

/// Record the outcome of a check run by an external scheduler
pub async fn record_result(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(result): Json<CheckResult>,
) -> Result<Json<Recorded>, ApiError> {
    Ok(Json(state.monitor.record(&key, &result).await?))
}

/// Replace an endpoint's alert rules. Invalid rules are rejected as a whole.
pub async fn replace_alerts(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(alerts): Json<Vec<Alert>>,
) -> Result<Json<EndpointStatus>, ApiError> {
    Ok(Json(state.monitor.reconfigure(&key, alerts).await?))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        match e {
            MonitorError::UnknownEndpoint(_) => ApiError::NotFound(e.to_string()),
            MonitorError::DuplicateEndpoint(_) | MonitorError::InvalidEndpoint(_) => {
                ApiError::BadRequest(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
