//! Wire types for the analysis service's JSON API.
//!
//! The service is lenient about what it sends (missing fields, `null`
//! progress, numbers as strings), so every field here has a default.

use std::collections::HashMap;

use relay_core::ProgressSnapshot;
use serde::{Deserialize, Deserializer, Serialize};

/// Key of the downloadable report artifact in [`ResultBundle::saved_files`].
pub const PDF_ARTIFACT_KEY: &str = "ReportAgent_pdf";

/// Key of the markdown report file in [`ResultBundle::saved_files`].
pub const MARKDOWN_ARTIFACT_KEY: &str = "ReportAgent_md";

/// Status value the service uses to refuse or fail a request.
pub const STATUS_ERROR: &str = "error";

/// Body of `POST /api/analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub industry_id: &'a str,
    pub focus_areas: &'a [String],
}

/// Response of `POST /api/analyze`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub progress: Option<f64>,
}

/// Response of `GET /api/status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub progress: Option<f64>,
}

impl From<StatusResponse> for ProgressSnapshot {
    fn from(response: StatusResponse) -> Self {
        ProgressSnapshot::new(response.progress.unwrap_or(0.0), response.status)
    }
}

/// Response of `GET /api/results`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultBundle {
    /// Output of the report stage, normally `{"report_content": "...", "report_type": "markdown"}`.
    #[serde(default)]
    pub report: Option<serde_json::Value>,
    /// Files the service wrote, keyed by artifact name.
    #[serde(default)]
    pub saved_files: HashMap<String, String>,
}

impl ResultBundle {
    /// Markdown body of the generated report, if the service returned one.
    pub fn markdown(&self) -> Option<&str> {
        self.report
            .as_ref()
            .and_then(|r| r.get("report_content"))
            .and_then(|c| c.as_str())
            .filter(|c| !c.trim().is_empty())
    }

    /// Non-empty path recorded under `key`.
    pub fn saved_file(&self, key: &str) -> Option<&str> {
        self.saved_files
            .get(key)
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
    }
}

/// Accept a number, a numeric string, or `null` for a percentage field.
fn lenient_percent<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
