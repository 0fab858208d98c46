use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the analysis service answered.
    pub backend_healthy: bool,
    /// Jobs known to this process.
    pub jobs: usize,
    /// Jobs whose poll loop is still running.
    pub active_jobs: usize,
}

/// GET /health -- returns relay and analysis service health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend_healthy = match state.backend.health().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Analysis service health probe failed");
            false
        }
    };

    let status = if backend_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        backend_healthy,
        jobs: state.store.len().await,
        active_jobs: state.driver.active_jobs(),
    })
}

/// Mount health check routes (root level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
