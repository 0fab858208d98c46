//! Per-observer streams of job phase transitions.
//!
//! Each call to [`phase_stream`] gets its own broadcast receiver, so
//! dropping a stream (for example when an HTTP client disconnects) only
//! unsubscribes that observer. The job's driver never notices.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use relay_core::{JobId, Phase};
use tokio::sync::broadcast::error::RecvError;

use crate::store::JobStore;

/// How often a stream for a not-yet-existing job re-checks the store.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(500);

/// Stream the phases of job `id`.
///
/// Yields the current phase first, then every later phase in order, and
/// ends right after yielding [`Phase::Done`]. Each phase is yielded at
/// most once. A job that is already done yields `Done` and ends.
///
/// An unknown id is not an error: the stream yields [`Phase::Analyzing`]
/// and re-checks the store every `refresh` until the job appears.
pub fn phase_stream(
    store: Arc<JobStore>,
    id: JobId,
    refresh: Duration,
) -> impl Stream<Item = Phase> + Send + 'static {
    async_stream::stream! {
        let mut last: Option<Phase> = None;

        let (current, mut rx) = loop {
            if let Some(attached) = store.subscribe(&id).await {
                break attached;
            }
            if last.is_none() {
                tracing::debug!(job_id = %id, "Subscribed to unknown job, waiting for it");
                last = Some(Phase::Analyzing);
                yield Phase::Analyzing;
            }
            tokio::time::sleep(refresh).await;
        };

        if is_newer(last, current) {
            last = Some(current);
            yield current;
        }

        let mut finished = current.is_terminal();
        while !finished {
            let next = match rx.recv().await {
                Ok(phase) => phase,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(job_id = %id, skipped, "Phase subscriber lagged, resyncing");
                    match store.phase(&id).await {
                        Some(phase) => phase,
                        None => break,
                    }
                }
                Err(RecvError::Closed) => break,
            };

            if is_newer(last, next) {
                last = Some(next);
                yield next;
            }
            finished = next.is_terminal();
        }
    }
}

fn is_newer(last: Option<Phase>, next: Phase) -> bool {
    match last {
        Some(last) => next > last,
        None => true,
    }
}
