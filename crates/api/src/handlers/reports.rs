//! Handlers for report jobs: submission, polling and the phase stream.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::{Stream, StreamExt};
use relay_core::error::CoreError;
use relay_core::industry;
use relay_core::types::Timestamp;
use relay_core::{JobId, Phase, Report};
use relay_events::phase_stream;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Interval between SSE keep-alive comments.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/report`. Every field is optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateReportRequest {
    /// Backend industry id or display name.
    #[serde(default)]
    #[validate(length(max = 200))]
    pub industry: Option<String>,
    /// Focus areas for the analysis; the configured defaults when absent.
    #[serde(default)]
    #[validate(length(max = 32))]
    pub focus_areas: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ReportCreated {
    pub id: JobId,
}

/// Body of `GET /api/report/{id}/status`.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub id: JobId,
    pub phase: Phase,
    pub done: bool,
    pub industry: &'static str,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
struct PhaseEvent {
    phase: Phase,
}

/// Parse a submission body. An empty body counts as `{}`.
fn parse_create_request(body: &[u8]) -> AppResult<CreateReportRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateReportRequest::default());
    }

    let request: CreateReportRequest = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?;
    request
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
    Ok(request)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/report
///
/// Starts an analysis run and returns the new job id with `202 Accepted`.
/// The job is polled in the background; clients follow it with
/// `GET /api/report/{id}` or the SSE stream.
pub async fn create_report(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let request = parse_create_request(&body)?;
    let id = state
        .driver
        .submit(request.industry.as_deref(), request.focus_areas)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(ReportCreated { id })))
}

/// GET /api/report/{id}
///
/// The final report once the job is done. Until then, and for ids this
/// process does not know, a pending placeholder report.
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Report>> {
    let id = JobId::from(id);

    let report = match state.store.get(&id).await {
        Some(record) => match record.report {
            Some(report) => report,
            None => Report::pending(record.industry, record.phase),
        },
        None => {
            tracing::debug!(job_id = %id, "Report requested for unknown job");
            let industry = industry::resolve(None, &state.config.default_industry);
            Report::pending(industry, Phase::Analyzing)
        }
    };

    Ok(Json(report))
}

/// GET /api/report/{id}/status
///
/// Current phase of a job. Unknown ids read as a fresh job.
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<JobStatusResponse>> {
    let id = JobId::from(id);

    let response = match state.store.get(&id).await {
        Some(record) => JobStatusResponse {
            done: record.is_done(),
            phase: record.phase,
            industry: record.industry.id,
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
            id,
        },
        None => JobStatusResponse {
            phase: Phase::Analyzing,
            done: false,
            industry: industry::resolve(None, &state.config.default_industry).id,
            created_at: None,
            updated_at: None,
            id,
        },
    };

    Ok(Json(response))
}

/// GET /api/report/{id}/stream
///
/// Server-sent events carrying `{"phase": "..."}`, one per phase change.
/// The stream closes after the `done` event or at server shutdown.
/// Disconnecting only drops this client's subscription.
pub async fn stream_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let id = JobId::from(id);
    tracing::debug!(job_id = %id, "Phase stream opened");

    let events = phase_stream(state.store.clone(), id, state.config.stream_refresh())
        .take_until(state.shutdown.clone().cancelled_owned())
        .map(|phase| Event::default().json_data(PhaseEvent { phase }));

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}
