//! In-memory job state and phase fan-out.
//!
//! - [`JobStore`]: the single source of truth for every job, keyed by
//!   [`JobId`](relay_core::JobId).
//! - [`JobWriter`]: the only handle allowed to mutate a job. Exactly one
//!   exists per job.
//! - [`phase_stream`]: a per-observer stream of phase transitions backed
//!   by a `tokio::sync::broadcast` channel owned by each job.

pub mod store;
pub mod subscription;

pub use store::{JobRecord, JobStore, JobWriter, StoreError};
pub use subscription::{phase_stream, DEFAULT_REFRESH_INTERVAL};
