//! Locating downloadable report artifacts on the serving host.

use std::path::{Path, PathBuf};

use relay_backend::messages::PDF_ARTIFACT_KEY;
use relay_backend::ResultBundle;
use relay_core::JobId;

/// Finds the PDF backing a finished job.
///
/// The analysis service records where it saved the PDF; when that path is
/// missing or not readable from here, the configured fallback path (the
/// service's fixed output location) is used instead.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    fallback: Option<PathBuf>,
}

impl ArtifactLocator {
    pub fn new(fallback: Option<PathBuf>) -> Self {
        Self { fallback }
    }

    /// Existing artifact file for `bundle`, if any.
    pub async fn locate(&self, bundle: &ResultBundle) -> Option<PathBuf> {
        if let Some(saved) = bundle.saved_file(PDF_ARTIFACT_KEY) {
            let saved = PathBuf::from(saved);
            if is_file(&saved).await {
                return Some(saved);
            }
            tracing::debug!(path = %saved.display(), "Saved artifact not readable, trying fallback");
        }

        match &self.fallback {
            Some(path) if is_file(path).await => Some(path.clone()),
            _ => None,
        }
    }
}

/// Client-facing link for a job's artifact.
pub fn download_url(id: &JobId) -> String {
    format!("/api/report/{id}/download")
}

/// Whether `path` names an existing regular file.
pub async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
