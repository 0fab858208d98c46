use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{downloads, reports};
use crate::state::AppState;

/// Read routes mounted at `/api/report`.
///
/// ```text
/// GET    /{id}             get_report
/// GET    /{id}/status      get_status
/// GET    /{id}/stream      stream_report
/// GET    /{id}/download    download_job_artifact
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(reports::get_report))
        .route("/{id}/status", get(reports::get_status))
        .route("/{id}/stream", get(reports::stream_report))
        .route("/{id}/download", get(downloads::download_job_artifact))
}

/// Submission route mounted at `/api/report`.
///
/// Kept apart from [`router`] because the analysis service answers the
/// start call only after the whole run, so it must not share the request
/// timeout.
///
/// ```text
/// POST   /                 create_report
/// ```
pub fn submit_router() -> Router<AppState> {
    Router::new().route("/", post(reports::create_report))
}
