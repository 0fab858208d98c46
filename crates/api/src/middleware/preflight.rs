use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Answer any `OPTIONS` request with an empty `200`.
///
/// CORS preflights are answered by the CORS layer before reaching this
/// middleware; this catches the remaining `OPTIONS` requests, which would
/// otherwise get `405` from the router.
pub async fn answer_options(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}
