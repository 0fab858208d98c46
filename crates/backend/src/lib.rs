//! Client for the external analysis service.
//!
//! [`AnalysisBackend`] is the seam the job driver depends on; [`HttpBackend`]
//! is the production implementation that talks JSON over HTTP. Tests swap
//! in their own implementations of the trait.

pub mod api;
pub mod messages;

use async_trait::async_trait;
use relay_core::ProgressSnapshot;

pub use api::{BackendError, HttpBackend};
pub use messages::{ResultBundle, StartAck};

/// The three logical calls the relay makes against the analysis service.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Ask the service to start an analysis run.
    async fn start_analysis(
        &self,
        industry_id: &str,
        focus_areas: &[String],
    ) -> Result<StartAck, BackendError>;

    /// Read the service's current progress.
    async fn get_progress(&self) -> Result<ProgressSnapshot, BackendError>;

    /// Fetch the results of a completed run.
    async fn get_results(&self) -> Result<ResultBundle, BackendError>;

    /// Cheap reachability probe.
    async fn health(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
