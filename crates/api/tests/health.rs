mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};

use common::{body_bytes, body_json, build_test_app, create_job, get, send, test_config, StubBackend};

#[tokio::test]
async fn health_reports_backend_and_jobs() {
    let (app, _state) = build_test_app(StubBackend::stuck(), test_config());
    create_job(&app, "{}").await;

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend_healthy"], true);
    assert_eq!(json["jobs"], 1);
    assert_eq!(json["active_jobs"], 1);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn health_is_degraded_when_backend_is_down() {
    let (app, _state) = build_test_app(StubBackend::refusing(), test_config());

    let json = body_json(get(&app, "/health").await).await;

    assert_eq!(json["status"], "degraded");
    assert_eq!(json["backend_healthy"], false);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let (app, _state) = build_test_app(StubBackend::stuck(), test_config());

    let response = get(&app, "/health").await;

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (app, _state) = build_test_app(StubBackend::stuck(), test_config());

    let response = get(&app, "/api/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// CORS
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_allows_any_origin() {
    let (app, _state) = build_test_app(StubBackend::stuck(), test_config());

    let response = send(
        &app,
        Request::get("/api/industries")
            .header(header::ORIGIN, "http://example.test")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let (app, _state) = build_test_app(StubBackend::stuck(), test_config());

    let response = send(
        &app,
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/report")
            .header(header::ORIGIN, "http://example.test")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn bare_options_gets_empty_ok_on_any_path() {
    let (app, _state) = build_test_app(StubBackend::stuck(), test_config());

    for uri in ["/api/report/abc", "/anything/else"] {
        let response = send(
            &app,
            Request::builder()
                .method(Method::OPTIONS)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK, "OPTIONS {uri}");
        assert!(body_bytes(response).await.is_empty());
    }
}
