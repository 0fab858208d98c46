//! The report payload handed to clients.

use serde::{Deserialize, Serialize};

use crate::industry::Industry;
use crate::phase::Phase;
use crate::types::Timestamp;

/// Overview used when the analysis finished but its results could not be
/// fetched.
pub const RESULTS_UNAVAILABLE_MESSAGE: &str = "The analysis completed, but its results could not \
     be retrieved from the analysis service. Please retry later or check the service logs.";

/// Overview used when a job exceeded its maximum lifetime.
pub const TIMED_OUT_MESSAGE: &str = "The analysis did not finish within the allowed time, so no \
     results are available for this report.";

/// A rendered report.
///
/// Every field is always present; sections that have no content are empty
/// strings and `pdf_url` is empty when no downloadable artifact exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub date: Timestamp,
    pub industry: String,
    pub overview: String,
    pub market: String,
    pub trends: String,
    pub risks: String,
    pub pdf_url: String,
}

impl Report {
    /// Title used when the generated report does not carry one.
    pub fn default_title(industry: &Industry) -> String {
        format!("{} Industry Analysis Report", industry.name)
    }

    /// A report whose only content is an explanatory overview.
    ///
    /// Used for the terminal state when no real results exist.
    pub fn degraded(industry: &Industry, overview: impl Into<String>) -> Self {
        Self {
            title: Self::default_title(industry),
            date: chrono::Utc::now(),
            industry: industry.name.to_string(),
            overview: overview.into(),
            market: String::new(),
            trends: String::new(),
            risks: String::new(),
            pdf_url: String::new(),
        }
    }

    /// Placeholder body served while a job has not finished yet.
    pub fn pending(industry: &Industry, phase: Phase) -> Self {
        Self::degraded(
            industry,
            format!("The report is still being prepared (current phase: {phase})."),
        )
    }

    /// Whether the report carries the fields every client renders.
    pub fn is_well_formed(&self) -> bool {
        !self.title.trim().is_empty() && !self.overview.trim().is_empty()
    }
}
