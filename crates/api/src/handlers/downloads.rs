//! Artifact downloads.
//!
//! Files are streamed from disk with [`ReaderStream`] rather than read into
//! memory.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::Response;
use relay_core::error::CoreError;
use relay_core::JobId;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Filename offered to browsers when the artifact's own name is unusable.
const DEFAULT_FILENAME: &str = "report.pdf";

/// GET /api/report/{id}/download
///
/// Streams the artifact recorded for a finished job.
pub async fn download_job_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = JobId::from(id);

    let path = state
        .store
        .get(&id)
        .await
        .and_then(|record| record.artifact_path)
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Report artifact",
                id: id.to_string(),
            })
        })?;

    serve_pdf(&path).await
}

/// GET /download/report.pdf
///
/// Streams the configured artifact file, whichever job produced it.
pub async fn download_latest_artifact(State(state): State<AppState>) -> AppResult<Response> {
    serve_pdf(&state.config.artifact_path).await
}

/// Stream the PDF at `path` as an attachment, or 404 if it does not exist.
async fn serve_pdf(path: &FsPath) -> AppResult<Response> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Report artifact",
                id: path.display().to_string(),
            }));
        }
        Err(e) => return Err(AppError::InternalError(e.to_string())),
    };

    let metadata = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    if !metadata.is_file() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Report artifact",
            id: path.display().to_string(),
        }));
    }

    let disposition = format!("attachment; filename=\"{}\"", attachment_name(path));
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, PDF_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

/// The file's own name if it is plain ASCII, else [`DEFAULT_FILENAME`].
fn attachment_name(path: &FsPath) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| n.chars().all(|c| c.is_ascii_graphic() && c != '"'))
        .unwrap_or(DEFAULT_FILENAME)
}
