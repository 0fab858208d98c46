//! Request handlers.
//!
//! Each submodule provides the async handler functions for one area of the
//! API. Errors are mapped to HTTP responses via [`AppError`](crate::error::AppError).

pub mod downloads;
pub mod industries;
pub mod reports;
