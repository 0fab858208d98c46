use axum::Json;
use relay_core::industry::{Industry, INDUSTRIES};

/// GET /api/industries
pub async fn list_industries() -> Json<&'static [Industry]> {
    Json(INDUSTRIES)
}
