use axum::routing::get;
use axum::Router;

use crate::handlers::industries;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/industries", get(industries::list_industries))
}
