use axum::routing::get;
use axum::Router;

use crate::handlers::downloads;
use crate::state::AppState;

/// Mount the legacy fixed download path (root level, not under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/download/report.pdf", get(downloads::download_latest_artifact))
}
