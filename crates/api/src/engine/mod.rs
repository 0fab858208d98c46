//! Job execution engine.
//!
//! Contains the driver that starts analysis runs and polls them to
//! completion, the report assembly that turns a finished run's results into
//! a [`Report`](relay_core::Report), and the lookup of downloadable
//! artifacts on the serving host.

pub mod artifacts;
pub mod driver;
pub mod report;

pub use driver::{DriverSettings, JobDriver};
pub use report::ReportBuilder;
