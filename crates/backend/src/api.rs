//! HTTP client for the analysis service.
//!
//! Wraps the service's REST endpoints (start, status, results) using
//! [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use relay_core::ProgressSnapshot;

use crate::messages::{AnalyzeRequest, ResultBundle, StartAck, StatusResponse, STATUS_ERROR};
use crate::AnalysisBackend;

/// HTTP client for a single analysis service instance.
///
/// `POST /api/analyze` runs the whole analysis before it answers, so the
/// start call has its own timeout, unbounded unless configured. Every other
/// call is bounded by the per-request timeout.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    start_timeout: Option<Duration>,
}

/// Errors from the analysis service client.
///
/// Every variant means the service is unavailable for this call; callers
/// decide whether that is fatal.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request itself failed (network, timeout, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Analysis service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The service answered but refused the request.
    #[error("Analysis service refused the request: {0}")]
    Rejected(String),
}

impl HttpBackend {
    /// Create a client for the service at `base_url`.
    ///
    /// * `base_url` - e.g. `http://localhost:8000`.
    /// * `timeout` - bound for status, results and health calls.
    ///
    /// The start call is unbounded; see [`HttpBackend::with_start_timeout`].
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url, timeout))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            request_timeout,
            start_timeout: None,
        }
    }

    /// Bound the start call. `None` waits for as long as the run takes.
    pub fn with_start_timeout(mut self, start_timeout: Option<Duration>) -> Self {
        self.start_timeout = start_timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`BackendError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    /// Sends `POST /api/analyze`. A 2xx answer whose `status` is `"error"`
    /// is reported as [`BackendError::Rejected`].
    async fn start_analysis(
        &self,
        industry_id: &str,
        focus_areas: &[String],
    ) -> Result<StartAck, BackendError> {
        let body = AnalyzeRequest {
            industry_id,
            focus_areas,
        };

        let mut request = self
            .client
            .post(format!("{}/api/analyze", self.base_url))
            .json(&body);
        if let Some(timeout) = self.start_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;

        let ack: StartAck = Self::parse_response(response).await?;
        if ack.status == STATUS_ERROR {
            return Err(BackendError::Rejected(ack.message));
        }

        tracing::debug!(industry_id, status = %ack.status, "Analysis start acknowledged");
        Ok(ack)
    }

    async fn get_progress(&self) -> Result<ProgressSnapshot, BackendError> {
        let response = self
            .client
            .get(format!("{}/api/status", self.base_url))
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status: StatusResponse = Self::parse_response(response).await?;
        Ok(status.into())
    }

    async fn get_results(&self) -> Result<ResultBundle, BackendError> {
        let response = self
            .client
            .get(format!("{}/api/results", self.base_url))
            .timeout(self.request_timeout)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn health(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}
