//! Keyed registry of job state.
//!
//! The index is a `RwLock<HashMap>` so concurrent jobs only contend for
//! the brief lookup. Each job then has its own lock around its record and
//! its own broadcast channel for phase changes. Phase changes are
//! published while the record's write lock is held, and subscriptions are
//! taken while its read lock is held, so a subscriber's snapshot and the
//! stream of later changes never overlap or leave a gap.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use relay_core::industry::Industry;
use relay_core::types::Timestamp;
use relay_core::{JobId, Phase, Report};
use tokio::sync::{broadcast, RwLock};

/// Buffer per job. A job publishes at most four phases, so receivers only
/// lag if they stop reading entirely.
const PHASE_CHANNEL_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// JobRecord
// ---------------------------------------------------------------------------

/// Point-in-time copy of a job.
///
/// `report` is `Some` exactly when `phase` is [`Phase::Done`].
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub industry: &'static Industry,
    pub phase: Phase,
    pub report: Option<Report>,
    /// Local file backing the report's download link, if any.
    pub artifact_path: Option<PathBuf>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JobRecord {
    fn new(id: JobId, industry: &'static Industry) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            industry,
            phase: Phase::Analyzing,
            report: None,
            artifact_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase.is_terminal()
    }
}

/// Errors from job store mutations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {0} already exists")]
    Duplicate(JobId),

    #[error("job {0} can only reach the done phase by completing it with a report")]
    CompletionRequiresReport(JobId),
}

struct JobSlot {
    record: RwLock<JobRecord>,
    phase_tx: broadcast::Sender<Phase>,
}

// ---------------------------------------------------------------------------
// JobStore
// ---------------------------------------------------------------------------

/// Process-wide registry of jobs.
///
/// Created once at startup and shared via `Arc<JobStore>`. Jobs are never
/// removed individually; [`clear`](Self::clear) drops everything at
/// shutdown.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Arc<JobSlot>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job under a freshly generated id.
    pub async fn create(&self, industry: &'static Industry) -> JobWriter {
        loop {
            match self.insert(JobId::generate(), industry).await {
                Ok(writer) => return writer,
                Err(e) => tracing::warn!(error = %e, "Generated job id collided, retrying"),
            }
        }
    }

    /// Register a new job under `id`, starting in [`Phase::Analyzing`].
    ///
    /// Returns the job's only [`JobWriter`], or [`StoreError::Duplicate`]
    /// if the id is taken.
    pub async fn insert(
        &self,
        id: JobId,
        industry: &'static Industry,
    ) -> Result<JobWriter, StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }

        let (phase_tx, _) = broadcast::channel(PHASE_CHANNEL_CAPACITY);
        let slot = Arc::new(JobSlot {
            record: RwLock::new(JobRecord::new(id.clone(), industry)),
            phase_tx,
        });
        jobs.insert(id.clone(), Arc::clone(&slot));

        tracing::debug!(job_id = %id, industry = industry.id, "Job registered");
        Ok(JobWriter { id, slot })
    }

    /// Snapshot of a job, or `None` if it does not exist.
    pub async fn get(&self, id: &JobId) -> Option<JobRecord> {
        let slot = self.slot(id).await?;
        let record = slot.record.read().await;
        Some(record.clone())
    }

    /// Current phase of a job, or `None` if it does not exist.
    pub async fn phase(&self, id: &JobId) -> Option<Phase> {
        let slot = self.slot(id).await?;
        let phase = slot.record.read().await.phase;
        Some(phase)
    }

    /// Current phase plus a receiver for every later phase change.
    pub async fn subscribe(&self, id: &JobId) -> Option<(Phase, broadcast::Receiver<Phase>)> {
        let slot = self.slot(id).await?;
        let record = slot.record.read().await;
        let rx = slot.phase_tx.subscribe();
        Some((record.phase, rx))
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Drop every job. Called at shutdown.
    pub async fn clear(&self) {
        let mut jobs = self.jobs.write().await;
        let count = jobs.len();
        jobs.clear();
        tracing::info!(count, "Job store cleared");
    }

    async fn slot(&self, id: &JobId) -> Option<Arc<JobSlot>> {
        self.jobs.read().await.get(id).cloned()
    }
}

// ---------------------------------------------------------------------------
// JobWriter
// ---------------------------------------------------------------------------

/// Exclusive write access to one job.
///
/// Not `Clone`: holding the writer is what makes a task the job's single
/// driver. [`complete`](Self::complete) consumes it, so a finished job can
/// never be written again.
pub struct JobWriter {
    id: JobId,
    slot: Arc<JobSlot>,
}

impl std::fmt::Debug for JobWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobWriter").field("id", &self.id).finish_non_exhaustive()
    }
}

impl JobWriter {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub async fn phase(&self) -> Phase {
        self.slot.record.read().await.phase
    }

    /// Move the job forward to `phase`.
    ///
    /// Returns `Ok(true)` if the phase changed and was published, and
    /// `Ok(false)` if `phase` is not ahead of the current one.
    pub async fn advance(&self, phase: Phase) -> Result<bool, StoreError> {
        if phase.is_terminal() {
            return Err(StoreError::CompletionRequiresReport(self.id.clone()));
        }

        let mut record = self.slot.record.write().await;
        if phase <= record.phase {
            return Ok(false);
        }
        record.phase = phase;
        record.updated_at = chrono::Utc::now();
        // A send error only means nobody is subscribed.
        let _ = self.slot.phase_tx.send(phase);
        Ok(true)
    }

    /// Finish the job: phase and report are written in one update.
    pub async fn complete(self, report: Report, artifact_path: Option<PathBuf>) -> JobRecord {
        let mut record = self.slot.record.write().await;
        record.phase = Phase::Done;
        record.report = Some(report);
        record.artifact_path = artifact_path;
        record.updated_at = chrono::Utc::now();
        let _ = self.slot.phase_tx.send(Phase::Done);
        record.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
