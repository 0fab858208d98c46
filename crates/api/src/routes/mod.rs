pub mod downloads;
pub mod health;
pub mod industries;
pub mod reports;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree covered by the request timeout.
///
/// Route hierarchy:
///
/// ```text
/// /report/{id}                 report, or pending placeholder (GET)
/// /report/{id}/status          current phase (GET)
/// /report/{id}/stream          phase changes as server-sent events (GET)
/// /report/{id}/download        the job's PDF artifact (GET)
///
/// /industries                  supported industries (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/report", reports::router())
        .merge(industries::router())
}

/// Routes exempt from the request timeout.
///
/// ```text
/// /api/report                  submit a report job (POST)
/// ```
pub fn untimed_routes() -> Router<AppState> {
    Router::new().nest("/api/report", reports::submit_router())
}
