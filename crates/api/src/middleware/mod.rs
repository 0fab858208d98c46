//! Request middleware.
//!
//! - [`preflight::answer_options`] -- Answers every `OPTIONS` request with an empty `200`.

pub mod preflight;
