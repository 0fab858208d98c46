//! Job lifecycle driver.
//!
//! [`JobDriver::submit`] starts an analysis run on the backend, registers
//! the job and returns its id right away. A background task per job then
//! polls the backend on a fixed interval, moves the job through its phases
//! and finally writes the report. The task holds the job's only
//! [`JobWriter`], so nothing else can mutate the job.

use std::sync::Arc;
use std::time::Duration;

use relay_backend::{AnalysisBackend, BackendError};
use relay_core::industry::{self, Industry};
use relay_core::{JobId, Phase};
use relay_events::{JobStore, JobWriter};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::report::ReportBuilder;
use crate::config::ServerConfig;

/// Tunables for the per-job poll loop.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub poll_interval: Duration,
    /// `None` lets a job poll until the backend reports completion.
    pub job_timeout: Option<Duration>,
    pub default_industry: String,
    pub focus_areas: Vec<String>,
}

impl From<&ServerConfig> for DriverSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            job_timeout: config.job_timeout(),
            default_industry: config.default_industry.clone(),
            focus_areas: config.focus_areas.clone(),
        }
    }
}

/// How one wait in the poll loop ended.
enum Wake {
    Cancelled,
    Expired,
    Polled { done: bool },
}

/// Starts jobs and drives each one to its terminal phase.
pub struct JobDriver {
    backend: Arc<dyn AnalysisBackend>,
    store: Arc<JobStore>,
    reports: ReportBuilder,
    settings: DriverSettings,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl JobDriver {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        store: Arc<JobStore>,
        reports: ReportBuilder,
        settings: DriverSettings,
    ) -> Self {
        Self {
            backend,
            store,
            reports,
            settings,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Start a report job.
    ///
    /// Performs exactly one backend round-trip. On success the job exists
    /// in the store in [`Phase::Analyzing`] and its poll loop is running in
    /// the background; on failure no job is created.
    pub async fn submit(
        self: &Arc<Self>,
        industry: Option<&str>,
        focus_areas: Option<Vec<String>>,
    ) -> Result<JobId, BackendError> {
        let industry = industry::resolve(industry, &self.settings.default_industry);
        let focus_areas = focus_areas
            .filter(|areas| !areas.is_empty())
            .unwrap_or_else(|| self.settings.focus_areas.clone());

        if let Err(e) = self.backend.start_analysis(industry.id, &focus_areas).await {
            tracing::warn!(industry = industry.id, error = %e, "Backend refused to start analysis");
            return Err(e);
        }

        let writer = self.store.create(industry).await;
        let id = writer.id().clone();
        tracing::info!(job_id = %id, industry = industry.id, "Report job started");

        let driver = Arc::clone(self);
        self.tasks.spawn(async move { driver.run(writer, industry).await });

        Ok(id)
    }

    /// Number of poll loops still running.
    pub fn active_jobs(&self) -> usize {
        self.tasks.len()
    }

    /// Stop every poll loop and wait up to `timeout` for them to exit.
    ///
    /// Stopped jobs keep their last phase. Returns `false` if the wait
    /// timed out.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.cancel.cancel();
        self.tasks.close();
        let active = self.tasks.len();
        let stopped = tokio::time::timeout(timeout, self.tasks.wait()).await.is_ok();
        tracing::info!(active, stopped, "Job driver shut down");
        stopped
    }

    // ---- poll loop ----

    async fn run(&self, writer: JobWriter, industry: &'static Industry) {
        let id = writer.id().clone();
        let deadline = self.settings.job_timeout.map(|t| Instant::now() + t);

        // The first tick of an interval fires immediately; polling starts
        // one full interval after creation.
        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.settings.poll_interval,
            self.settings.poll_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wake = tokio::select! {
                _ = self.cancel.cancelled() => Wake::Cancelled,
                _ = expire_at(deadline) => Wake::Expired,
                done = self.poll_tick(&writer, &mut ticker) => Wake::Polled { done },
            };

            match wake {
                Wake::Polled { done: false } => continue,
                Wake::Polled { done: true } => break,
                Wake::Cancelled => {
                    tracing::info!(job_id = %id, "Job poll loop stopping for shutdown");
                    return;
                }
                Wake::Expired => {
                    tracing::warn!(job_id = %id, "Job exceeded its lifetime, completing as timed out");
                    writer.complete(ReportBuilder::timed_out(industry), None).await;
                    return;
                }
            }
        }

        self.finish(writer, industry).await;
    }

    /// Wait for the next tick and poll once. Returns `true` once the
    /// backend reports completion.
    async fn poll_tick(&self, writer: &JobWriter, ticker: &mut Interval) -> bool {
        ticker.tick().await;

        let snapshot = match self.backend.get_progress().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(job_id = %writer.id(), error = %e, "Progress poll failed, retrying next tick");
                return false;
            }
        };

        let phase = Phase::from_progress(&snapshot);
        if phase.is_terminal() {
            return true;
        }

        match writer.advance(phase).await {
            Ok(true) => {
                tracing::info!(job_id = %writer.id(), phase = %phase, percent = snapshot.percent, "Job phase advanced");
            }
            Ok(false) => {
                tracing::debug!(job_id = %writer.id(), percent = snapshot.percent, "Job phase unchanged");
            }
            Err(e) => {
                tracing::error!(job_id = %writer.id(), error = %e, "Failed to record job phase");
            }
        }
        false
    }

    /// Fetch results once and write the terminal report.
    async fn finish(&self, writer: JobWriter, industry: &'static Industry) {
        let id = writer.id().clone();

        let (report, artifact) = match self.backend.get_results().await {
            Ok(bundle) => self.reports.from_results(&id, industry, &bundle).await,
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Failed to fetch results, completing with degraded report");
                (ReportBuilder::results_unavailable(industry), None)
            }
        };

        let record = writer.complete(report, artifact).await;
        tracing::info!(
            job_id = %id,
            has_artifact = record.artifact_path.is_some(),
            "Report job completed",
        );
    }
}

async fn expire_at(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use futures::StreamExt;
    use relay_backend::{ResultBundle, StartAck};
    use relay_core::report::{RESULTS_UNAVAILABLE_MESSAGE, TIMED_OUT_MESSAGE};
    use relay_core::ProgressSnapshot;
    use relay_events::{phase_stream, JobRecord};

    const INTERVAL: Duration = Duration::from_millis(800);

    /// Backend that replays a script of progress answers.
    ///
    /// `None` entries are failed polls; the last entry repeats forever.
    #[derive(Default)]
    struct ScriptedBackend {
        refuse_start: bool,
        progress: Mutex<VecDeque<Option<f64>>>,
        results: Option<ResultBundle>,
        delay: Duration,
        started: Mutex<Vec<(String, Vec<String>)>>,
        progress_calls: AtomicUsize,
        results_calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedBackend {
        fn with_progress(script: &[Option<f64>]) -> Self {
            Self {
                progress: Mutex::new(script.iter().copied().collect()),
                results: Some(ResultBundle::default()),
                ..Self::default()
            }
        }

        fn unavailable() -> BackendError {
            BackendError::Api {
                status: 503,
                body: "unavailable".into(),
            }
        }
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedBackend {
        async fn start_analysis(
            &self,
            industry_id: &str,
            focus_areas: &[String],
        ) -> Result<StartAck, BackendError> {
            if self.refuse_start {
                return Err(BackendError::Rejected("busy".into()));
            }
            self.started
                .lock()
                .unwrap()
                .push((industry_id.to_string(), focus_areas.to_vec()));
            Ok(StartAck::default())
        }

        async fn get_progress(&self) -> Result<ProgressSnapshot, BackendError> {
            self.progress_calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let next = {
                let mut script = self.progress.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front().flatten()
                } else {
                    script.front().copied().flatten()
                }
            };
            next.map(|p| ProgressSnapshot::new(p, None))
                .ok_or_else(Self::unavailable)
        }

        async fn get_results(&self) -> Result<ResultBundle, BackendError> {
            self.results_calls.fetch_add(1, Ordering::SeqCst);
            self.results.clone().ok_or_else(Self::unavailable)
        }
    }

    fn settings() -> DriverSettings {
        DriverSettings {
            poll_interval: INTERVAL,
            job_timeout: None,
            default_industry: "ai-tech".into(),
            focus_areas: vec!["macro".into()],
        }
    }

    fn driver_with(backend: Arc<ScriptedBackend>, settings: DriverSettings) -> (Arc<JobDriver>, Arc<JobStore>) {
        let store = Arc::new(JobStore::new());
        let driver = Arc::new(JobDriver::new(
            backend,
            Arc::clone(&store),
            ReportBuilder::markdown(None),
            settings,
        ));
        (driver, store)
    }

    async fn wait_until_done(store: &JobStore, id: &JobId) -> JobRecord {
        for _ in 0..1_000 {
            if let Some(record) = store.get(id).await.filter(JobRecord::is_done) {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("job {id} never completed");
    }

    // ---------------------------------------------------------------------------
    // Submission
    // ---------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn submit_returns_before_any_poll() {
        let backend = Arc::new(ScriptedBackend::with_progress(&[Some(10.0)]));
        let (driver, store) = driver_with(Arc::clone(&backend), settings());

        let id = driver.submit(Some("healthcare"), None).await.unwrap();

        assert_eq!(backend.progress_calls.load(Ordering::SeqCst), 0);
        let record = store.get(&id).await.unwrap();
        assert_eq!(record.phase, Phase::Analyzing);
        assert_eq!(record.industry.id, "healthcare");
        assert_eq!(driver.active_jobs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_industry_and_focus_areas_use_defaults() {
        let backend = Arc::new(ScriptedBackend::with_progress(&[Some(10.0)]));
        let (driver, _store) = driver_with(Arc::clone(&backend), settings());

        driver.submit(None, Some(Vec::new())).await.unwrap();
        driver.submit(Some("金融服务"), Some(vec!["market".into()])).await.unwrap();

        let started = backend.started.lock().unwrap().clone();
        assert_eq!(started[0], ("ai-tech".to_string(), vec!["macro".to_string()]));
        assert_eq!(started[1], ("finance".to_string(), vec!["market".to_string()]));
    }

    #[tokio::test(start_paused = true)]
    async fn refused_start_creates_no_job() {
        let backend = Arc::new(ScriptedBackend {
            refuse_start: true,
            ..ScriptedBackend::default()
        });
        let (driver, store) = driver_with(backend, settings());

        let result = driver.submit(None, None).await;

        assert_matches!(result, Err(BackendError::Rejected(_)));
        assert!(store.is_empty().await);
        assert_eq!(driver.active_jobs(), 0);
    }

    // ---------------------------------------------------------------------------
    // Poll loop
    // ---------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn phases_follow_progress_to_done() {
        let backend = Arc::new(ScriptedBackend::with_progress(&[
            Some(10.0),
            Some(45.0),
            Some(80.0),
            Some(100.0),
        ]));
        let (driver, store) = driver_with(Arc::clone(&backend), settings());

        let id = driver.submit(None, None).await.unwrap();
        let phases: Vec<_> = phase_stream(Arc::clone(&store), id.clone(), INTERVAL)
            .collect()
            .await;

        assert_eq!(
            phases,
            vec![Phase::Analyzing, Phase::Fetching, Phase::Generating, Phase::Done]
        );
        let record = store.get(&id).await.unwrap();
        assert!(record.report.unwrap().is_well_formed());
        assert_eq!(backend.results_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn regressing_progress_never_moves_phase_back() {
        let backend = Arc::new(ScriptedBackend::with_progress(&[
            Some(80.0),
            Some(20.0),
            Some(50.0),
            Some(100.0),
        ]));
        let (driver, store) = driver_with(backend, settings());

        let id = driver.submit(None, None).await.unwrap();
        let phases: Vec<_> = phase_stream(Arc::clone(&store), id, INTERVAL)
            .collect()
            .await;

        assert_eq!(phases, vec![Phase::Analyzing, Phase::Generating, Phase::Done]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_polls_are_retried() {
        let backend = Arc::new(ScriptedBackend::with_progress(&[
            None,
            Some(40.0),
            None,
            Some(100.0),
        ]));
        let (driver, store) = driver_with(Arc::clone(&backend), settings());

        let id = driver.submit(None, None).await.unwrap();
        let record = wait_until_done(&store, &id).await;

        assert!(record.report.is_some());
        assert_eq!(backend.progress_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_result_fetch_still_completes() {
        let backend = Arc::new(ScriptedBackend {
            results: None,
            ..ScriptedBackend::with_progress(&[Some(100.0)])
        });
        let (driver, store) = driver_with(backend, settings());

        let id = driver.submit(None, None).await.unwrap();
        let record = wait_until_done(&store, &id).await;

        let report = record.report.unwrap();
        assert!(report.is_well_formed());
        assert_eq!(report.overview, RESULTS_UNAVAILABLE_MESSAGE);
        assert!(report.pdf_url.is_empty());
        assert!(record.artifact_path.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_never_overlap_with_slow_backend() {
        let mut script = vec![Some(10.0); 6];
        script.push(Some(100.0));
        let backend = Arc::new(ScriptedBackend {
            delay: INTERVAL * 3,
            ..ScriptedBackend::with_progress(&script)
        });
        let (driver, store) = driver_with(Arc::clone(&backend), settings());

        let id = driver.submit(None, None).await.unwrap();
        wait_until_done(&store, &id).await;

        assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(backend.progress_calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn job_past_its_lifetime_times_out() {
        let backend = Arc::new(ScriptedBackend::with_progress(&[Some(50.0)]));
        let (driver, store) = driver_with(
            Arc::clone(&backend),
            DriverSettings {
                job_timeout: Some(Duration::from_secs(10)),
                ..settings()
            },
        );

        let id = driver.submit(None, None).await.unwrap();
        let record = wait_until_done(&store, &id).await;

        assert_eq!(record.report.unwrap().overview, TIMED_OUT_MESSAGE);
        assert_eq!(backend.results_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_loops_without_completing() {
        let backend = Arc::new(ScriptedBackend::with_progress(&[Some(40.0)]));
        let (driver, store) = driver_with(backend, settings());

        let id = driver.submit(None, None).await.unwrap();
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(store.phase(&id).await, Some(Phase::Fetching));

        assert!(driver.shutdown(Duration::from_secs(5)).await);
        assert_eq!(driver.active_jobs(), 0);
        assert_eq!(store.phase(&id).await, Some(Phase::Fetching));
    }
}
