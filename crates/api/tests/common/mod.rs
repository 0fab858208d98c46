#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use relay_backend::{AnalysisBackend, BackendError, ResultBundle, StartAck};
use relay_core::ProgressSnapshot;
use relay_events::JobStore;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use relay_api::config::ServerConfig;
use relay_api::engine::{DriverSettings, JobDriver, ReportBuilder};
use relay_api::router::build_app_router;
use relay_api::state::AppState;

/// Stand-in for the analysis service.
///
/// Progress answers are replayed from a script whose last entry repeats.
pub struct StubBackend {
    pub refuse_start: bool,
    pub healthy: bool,
    pub progress: Mutex<VecDeque<f64>>,
    pub results: Option<ResultBundle>,
    pub starts: AtomicUsize,
}

impl StubBackend {
    /// A backend whose runs finish after a few polls.
    pub fn completing() -> Self {
        Self::with_progress(&[10.0, 50.0, 80.0, 100.0])
    }

    /// A backend whose runs never finish.
    pub fn stuck() -> Self {
        Self::with_progress(&[10.0])
    }

    pub fn with_progress(script: &[f64]) -> Self {
        Self {
            refuse_start: false,
            healthy: true,
            progress: Mutex::new(script.iter().copied().collect()),
            results: Some(ResultBundle {
                report: Some(serde_json::json!({
                    "report_content": "# Test Report\n## Overview\nAll good.\n## Market\nGrowing.",
                    "report_type": "markdown"
                })),
                saved_files: Default::default(),
            }),
            starts: AtomicUsize::new(0),
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse_start: true,
            healthy: false,
            ..Self::stuck()
        }
    }

    fn unavailable() -> BackendError {
        BackendError::Api {
            status: 503,
            body: "unavailable".into(),
        }
    }
}

#[async_trait]
impl AnalysisBackend for StubBackend {
    async fn start_analysis(
        &self,
        _industry_id: &str,
        _focus_areas: &[String],
    ) -> Result<StartAck, BackendError> {
        if self.refuse_start {
            return Err(BackendError::Rejected("analysis already running".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(StartAck::default())
    }

    async fn get_progress(&self) -> Result<ProgressSnapshot, BackendError> {
        let mut script = self.progress.lock().unwrap();
        let percent = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().copied()
        };
        percent
            .map(|p| ProgressSnapshot::new(p, None))
            .ok_or_else(Self::unavailable)
    }

    async fn get_results(&self) -> Result<ResultBundle, BackendError> {
        self.results.clone().ok_or_else(Self::unavailable)
    }

    async fn health(&self) -> Result<(), BackendError> {
        if self.healthy {
            Ok(())
        } else {
            Err(Self::unavailable())
        }
    }
}

/// Build a test `ServerConfig` with fast polling.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        poll_interval_ms: 10,
        stream_refresh_ms: 10,
        artifact_path: PathBuf::from("does/not/exist/report.pdf"),
        ..ServerConfig::default()
    }
}

/// Build the full application router with all middleware layers around
/// `backend`, returning the state so tests can inspect the job store.
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack.
pub fn build_test_app(backend: StubBackend, config: ServerConfig) -> (Router, AppState) {
    build_app_with(Arc::new(backend), config)
}

/// Like [`build_test_app`] with any backend, e.g. a real `HttpBackend`.
pub fn build_app_with(
    backend: Arc<dyn AnalysisBackend>,
    config: ServerConfig,
) -> (Router, AppState) {
    let store = Arc::new(JobStore::new());
    let driver = Arc::new(JobDriver::new(
        Arc::clone(&backend),
        Arc::clone(&store),
        ReportBuilder::markdown(Some(config.artifact_path.clone())),
        DriverSettings::from(&config),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        driver,
        backend,
        shutdown: CancellationToken::new(),
    };

    (build_app_router(state.clone(), &config), state)
}

/// Send a request through the router.
pub async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> axum::response::Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &Router, uri: &str, body: &str) -> axum::response::Response {
    send(
        app,
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit a job and return its id.
pub async fn create_job(app: &Router, body: &str) -> String {
    let response = post_json(app, "/api/report", body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

/// Poll `GET /api/report/{id}/status` until the job is done.
pub async fn wait_until_done(app: &Router, id: &str) {
    for _ in 0..500 {
        let status = body_json(get(app, &format!("/api/report/{id}/status")).await).await;
        if status["done"] == true {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} never completed");
}
