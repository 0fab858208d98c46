//! Client-facing job phases and the mapping from backend progress.
//!
//! The backend reports a raw completion percentage; clients only ever see
//! one of four coarse phases. The variants are declared in lifecycle order
//! so `Ord` doubles as the "has advanced past" relation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Progress at or above which a job counts as fetching data.
pub const FETCHING_THRESHOLD: f64 = 30.0;

/// Progress at or above which a job counts as generating the report.
pub const GENERATING_THRESHOLD: f64 = 70.0;

/// Progress at or above which a job is complete.
pub const DONE_THRESHOLD: f64 = 100.0;

/// Backend status strings that mark an analysis as finished regardless
/// of the reported percentage.
pub const COMPLETED_STATUSES: &[&str] = &["completed", "success"];

/// Phase of a report job. Strictly forward-moving; `Done` is terminal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Analyzing,
    Fetching,
    Generating,
    Done,
}

impl Phase {
    /// Map a polled progress snapshot onto a phase.
    ///
    /// A completed status takes priority over the percentage bands.
    pub fn from_progress(snapshot: &ProgressSnapshot) -> Self {
        if snapshot.is_complete() {
            return Phase::Done;
        }
        let percent = snapshot.percent;
        if percent >= GENERATING_THRESHOLD {
            Phase::Generating
        } else if percent >= FETCHING_THRESHOLD {
            Phase::Fetching
        } else {
            Phase::Analyzing
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Done
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Analyzing => "analyzing",
            Phase::Fetching => "fetching",
            Phase::Generating => "generating",
            Phase::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One polled reading of backend progress. Never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSnapshot {
    /// Completion percentage, nominally 0-100.
    pub percent: f64,
    /// Backend status string such as `"running"` or `"completed"`.
    pub status: Option<String>,
}

impl ProgressSnapshot {
    pub fn new(percent: f64, status: Option<String>) -> Self {
        Self { percent, status }
    }

    /// Whether the backend considers the analysis finished.
    pub fn is_complete(&self) -> bool {
        self.percent >= DONE_THRESHOLD
            || self
                .status
                .as_deref()
                .is_some_and(|s| COMPLETED_STATUSES.contains(&s))
    }
}
