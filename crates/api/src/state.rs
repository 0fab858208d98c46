use std::sync::Arc;

use relay_backend::AnalysisBackend;
use relay_events::JobStore;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::engine::JobDriver;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (every field is behind an `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// In-memory registry of every job started by this process.
    pub store: Arc<JobStore>,
    /// Starts jobs and owns their background poll loops.
    pub driver: Arc<JobDriver>,
    /// Analysis service client, used directly for health probes.
    pub backend: Arc<dyn AnalysisBackend>,
    /// Cancelled when the server starts shutting down; ends open streams so
    /// graceful shutdown does not wait on them.
    pub shutdown: CancellationToken,
}
