//! Domain types shared by every report-relay crate.
//!
//! Nothing in here performs I/O: the backend client, job store and HTTP
//! layer all build on these types.

pub mod error;
pub mod industry;
pub mod phase;
pub mod report;
pub mod types;

pub use phase::{Phase, ProgressSnapshot};
pub use report::Report;
pub use types::JobId;
