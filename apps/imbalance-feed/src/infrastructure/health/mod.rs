//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, pump liveness reporting, and Prometheus
//! metrics. Chart data is never served here.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (pump running)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::{PumpPhase, PumpState};
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Feed version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Update pump status.
    pub pump: PumpStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Pump iterating.
    Healthy,
    /// Pump not yet through its first iteration, or stopped on request.
    Degraded,
    /// Pump died; the chart no longer updates.
    Unhealthy,
}

/// Update pump status.
#[derive(Debug, Clone, Serialize)]
pub struct PumpStatus {
    /// Lifecycle phase.
    pub phase: PumpPhase,
    /// Completion time of the last successful iteration.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Completed iterations.
    pub iterations: u64,
    /// Updates handed to the dispatcher.
    pub updates_sent: u64,
    /// Completed live sessions.
    pub sessions_completed: u64,
    /// Terminal failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl PumpStatus {
    /// Snapshot a pump's state.
    #[must_use]
    pub fn from_state(state: &PumpState) -> Self {
        Self {
            phase: state.phase(),
            last_success_at: state.last_success_at(),
            iterations: state.iterations(),
            updates_sent: state.updates_sent(),
            sessions_completed: state.sessions_completed(),
            failure: state.failure(),
        }
    }
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    pump: Arc<PumpState>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(version: String, pump: Arc<PumpState>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            pump,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.pump.phase() == PumpPhase::Running {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let pump = PumpStatus::from_state(&state.pump);

    HealthResponse {
        status: determine_health_status(pump.phase),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        pump,
    }
}

const fn determine_health_status(phase: PumpPhase) -> HealthStatus {
    match phase {
        PumpPhase::Running => HealthStatus::Healthy,
        PumpPhase::Starting | PumpPhase::Stopped => HealthStatus::Degraded,
        PumpPhase::Failed => HealthStatus::Unhealthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use test_case::test_case;
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test_case(PumpPhase::Starting, HealthStatus::Degraded ; "starting")]
    #[test_case(PumpPhase::Running, HealthStatus::Healthy ; "running")]
    #[test_case(PumpPhase::Stopped, HealthStatus::Degraded ; "stopped")]
    #[test_case(PumpPhase::Failed, HealthStatus::Unhealthy ; "failed")]
    fn status_follows_pump_phase(phase: PumpPhase, expected: HealthStatus) {
        assert_eq!(determine_health_status(phase), expected);
    }

    #[test]
    fn failed_pump_reports_its_failure() {
        let pump = Arc::new(PumpState::new());
        pump.record_iteration();
        pump.set_failed("malformed record".to_string());

        let state = HealthServerState::new("0.1.0".to_string(), pump);
        let response = build_health_response(&state);

        assert_eq!(response.status, HealthStatus::Unhealthy);
        assert_eq!(response.pump.failure.as_deref(), Some("malformed record"));
        assert!(response.pump.last_success_at.is_some());
    }

    #[tokio::test]
    async fn readiness_tracks_the_pump() {
        let pump = Arc::new(PumpState::new());
        let state = Arc::new(HealthServerState::new("0.1.0".to_string(), Arc::clone(&pump)));

        let request = || Request::builder().uri("/readyz").body(Body::empty()).unwrap();

        let response = router(Arc::clone(&state)).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        pump.record_iteration();
        let response = router(state).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_endpoint_returns_json() {
        let state = Arc::new(HealthServerState::new(
            "0.1.0".to_string(),
            Arc::new(PumpState::new()),
        ));
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
