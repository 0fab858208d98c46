//! Report assembly from a finished analysis run.
//!
//! The analysis service returns its report as markdown (inline, or as a
//! file on disk). A [`SectionExtractor`] splits that markdown into the
//! narrative sections clients render, and [`ReportBuilder`] combines the
//! sections with the job's industry and artifact link.

use std::path::PathBuf;
use std::sync::Arc;

use relay_backend::messages::MARKDOWN_ARTIFACT_KEY;
use relay_backend::ResultBundle;
use relay_core::industry::Industry;
use relay_core::report::{RESULTS_UNAVAILABLE_MESSAGE, TIMED_OUT_MESSAGE};
use relay_core::{JobId, Report};

use super::artifacts::{download_url, ArtifactLocator};

/// Overview used when the run produced no readable report body.
pub const PLACEHOLDER_OVERVIEW: &str = "The report has been generated. Use the download link \
     to get the full document.";

/// Narrative content pulled out of a generated report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedReport {
    pub title: Option<String>,
    pub overview: String,
    pub market: String,
    pub trends: String,
    pub risks: String,
}

/// Splits a report body into client-facing sections.
pub trait SectionExtractor: Send + Sync {
    fn extract(&self, markdown: &str) -> ExtractedReport;
}

/// Extracts sections from markdown headings.
///
/// The first `# ` heading becomes the title. Level-two sections fill
/// overview, market, trends and risks in document order; any further
/// sections are appended to risks. Text before the first level-two heading
/// is prepended to the overview.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownSections;

impl SectionExtractor for MarkdownSections {
    fn extract(&self, markdown: &str) -> ExtractedReport {
        let mut title = None;
        let mut preamble: Vec<&str> = Vec::new();
        let mut sections: Vec<Vec<&str>> = Vec::new();

        for line in markdown.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("## ") {
                sections.push(Vec::new());
                continue;
            }
            if title.is_none() && sections.is_empty() {
                if let Some(heading) = trimmed.strip_prefix("# ") {
                    title = Some(heading.trim().to_string()).filter(|t| !t.is_empty());
                    continue;
                }
            }
            match sections.last_mut() {
                Some(body) => body.push(line),
                None => preamble.push(line),
            }
        }

        let mut bodies = sections.into_iter().map(|lines| lines.join("\n").trim().to_string());
        let first = bodies.next().unwrap_or_default();
        let overview = join_paragraphs([preamble.join("\n").trim().to_string(), first]);
        let market = bodies.next().unwrap_or_default();
        let trends = bodies.next().unwrap_or_default();
        let risks = join_paragraphs(bodies);

        ExtractedReport {
            title,
            overview,
            market,
            trends,
            risks,
        }
    }
}

/// Stub extractor that ignores the body and points at the download link.
///
/// Used when the run produced no markdown at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderSections;

impl SectionExtractor for PlaceholderSections {
    fn extract(&self, _markdown: &str) -> ExtractedReport {
        ExtractedReport {
            overview: PLACEHOLDER_OVERVIEW.to_string(),
            ..ExtractedReport::default()
        }
    }
}

fn join_paragraphs(parts: impl IntoIterator<Item = String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the terminal [`Report`] of a job.
#[derive(Clone)]
pub struct ReportBuilder {
    extractor: Arc<dyn SectionExtractor>,
    artifacts: ArtifactLocator,
}

impl ReportBuilder {
    pub fn new(extractor: Arc<dyn SectionExtractor>, artifacts: ArtifactLocator) -> Self {
        Self {
            extractor,
            artifacts,
        }
    }

    /// Markdown extraction with `fallback_artifact` as the artifact of last
    /// resort.
    pub fn markdown(fallback_artifact: Option<PathBuf>) -> Self {
        Self::new(Arc::new(MarkdownSections), ArtifactLocator::new(fallback_artifact))
    }

    /// Report for a run whose results were fetched.
    ///
    /// Returns the report together with the local artifact its `pdf_url`
    /// points at, if one exists.
    pub async fn from_results(
        &self,
        id: &JobId,
        industry: &Industry,
        bundle: &ResultBundle,
    ) -> (Report, Option<PathBuf>) {
        let extracted = match self.load_markdown(bundle).await {
            Some(markdown) => self.extractor.extract(&markdown),
            None => {
                tracing::debug!(job_id = %id, "No report body in results, using placeholder");
                PlaceholderSections.extract("")
            }
        };

        let artifact = self.artifacts.locate(bundle).await;
        let pdf_url = artifact.as_ref().map(|_| download_url(id)).unwrap_or_default();

        let overview = if extracted.overview.trim().is_empty() {
            PLACEHOLDER_OVERVIEW.to_string()
        } else {
            extracted.overview
        };

        let report = Report {
            title: extracted
                .title
                .unwrap_or_else(|| Report::default_title(industry)),
            date: chrono::Utc::now(),
            industry: industry.name.to_string(),
            overview,
            market: extracted.market,
            trends: extracted.trends,
            risks: extracted.risks,
            pdf_url,
        };
        (report, artifact)
    }

    /// Report for a run that finished but whose results could not be fetched.
    pub fn results_unavailable(industry: &Industry) -> Report {
        Report::degraded(industry, RESULTS_UNAVAILABLE_MESSAGE)
    }

    /// Report for a run that exceeded the job lifetime cap.
    pub fn timed_out(industry: &Industry) -> Report {
        Report::degraded(industry, TIMED_OUT_MESSAGE)
    }

    /// Inline report body, else the markdown file the service saved.
    async fn load_markdown(&self, bundle: &ResultBundle) -> Option<String> {
        if let Some(markdown) = bundle.markdown() {
            return Some(markdown.to_string());
        }

        let path = bundle.saved_file(MARKDOWN_ARTIFACT_KEY)?;
        match tokio::fs::read_to_string(path).await {
            Ok(markdown) if !markdown.trim().is_empty() => Some(markdown),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path, error = %e, "Failed to read saved markdown report");
                None
            }
        }
    }
}
