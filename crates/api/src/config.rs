use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use relay_core::industry::DEFAULT_INDUSTRY_ID;

/// CORS origin value that allows every origin.
pub const ANY_ORIGIN: &str = "*";

/// Focus areas sent to the backend when a request does not name any.
const DEFAULT_FOCUS_AREAS: &str = "宏观经济,财务,市场,预测";

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running next to a local analysis
/// service. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8081`).
    pub port: u16,
    /// Base URL of the analysis service.
    pub backend_url: String,
    /// Per-request timeout for analysis service polls, in seconds.
    pub backend_timeout_secs: u64,
    /// Timeout for the start call, which blocks for the whole run;
    /// `0` waits indefinitely.
    pub backend_start_timeout_secs: u64,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// A `*` entry allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight jobs to stop.
    pub shutdown_timeout_secs: u64,
    /// Interval between progress polls for each job.
    pub poll_interval_ms: u64,
    /// How often a stream for an unknown job re-checks the store.
    pub stream_refresh_ms: u64,
    /// Maximum job lifetime in seconds; `0` disables the cap.
    pub job_timeout_secs: u64,
    /// Industry id used when a request names none or an unknown one.
    pub default_industry: String,
    /// Focus areas sent when a request does not name any.
    pub focus_areas: Vec<String>,
    /// Artifact served by `GET /download/report.pdf`, also used as the
    /// fallback artifact of finished jobs.
    pub artifact_path: PathBuf,
    /// Directory served for unmatched GET requests, if any.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8081,
            backend_url: "http://localhost:8000".into(),
            backend_timeout_secs: 30,
            backend_start_timeout_secs: 0,
            cors_origins: vec![ANY_ORIGIN.into()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 10,
            poll_interval_ms: 800,
            stream_refresh_ms: 500,
            job_timeout_secs: 3600,
            default_industry: DEFAULT_INDUSTRY_ID.into(),
            focus_areas: split_list(DEFAULT_FOCUS_AREAS),
            artifact_path: PathBuf::from("output/ReportAgent_report.pdf"),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                         |
    /// |------------------------------|---------------------------------|
    /// | `HOST`                       | `0.0.0.0`                       |
    /// | `PORT`                       | `8081`                          |
    /// | `BACKEND_URL`                | `http://localhost:8000`         |
    /// | `BACKEND_TIMEOUT_SECS`       | `30`                            |
    /// | `BACKEND_START_TIMEOUT_SECS` | `0` (no limit)                  |
    /// | `CORS_ORIGINS`               | `*`                             |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                            |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `10`                            |
    /// | `POLL_INTERVAL_MS`           | `800`                           |
    /// | `STREAM_REFRESH_MS`          | `500`                           |
    /// | `JOB_TIMEOUT_SECS`           | `3600` (`0` disables)           |
    /// | `DEFAULT_INDUSTRY`           | `new-energy-vehicle`            |
    /// | `FOCUS_AREAS`                | `宏观经济,财务,市场,预测`       |
    /// | `ARTIFACT_PATH`              | `output/ReportAgent_report.pdf` |
    /// | `STATIC_DIR`                 | unset                           |
    ///
    /// Panics on unparsable numbers so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port: u16 = parse_env("PORT", defaults.port);

        let backend_url = std::env::var("BACKEND_URL").unwrap_or(defaults.backend_url);
        let backend_timeout_secs = parse_env("BACKEND_TIMEOUT_SECS", defaults.backend_timeout_secs);
        let backend_start_timeout_secs =
            parse_env("BACKEND_START_TIMEOUT_SECS", defaults.backend_start_timeout_secs);

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.cors_origins);

        let request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs);
        let shutdown_timeout_secs =
            parse_env("SHUTDOWN_TIMEOUT_SECS", defaults.shutdown_timeout_secs);
        let poll_interval_ms = parse_env("POLL_INTERVAL_MS", defaults.poll_interval_ms);
        let stream_refresh_ms = parse_env("STREAM_REFRESH_MS", defaults.stream_refresh_ms);
        let job_timeout_secs = parse_env("JOB_TIMEOUT_SECS", defaults.job_timeout_secs);

        assert!(poll_interval_ms > 0, "POLL_INTERVAL_MS must be greater than 0");
        assert!(stream_refresh_ms > 0, "STREAM_REFRESH_MS must be greater than 0");

        let default_industry =
            std::env::var("DEFAULT_INDUSTRY").unwrap_or(defaults.default_industry);

        let focus_areas = std::env::var("FOCUS_AREAS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.focus_areas);

        let artifact_path = std::env::var("ARTIFACT_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.artifact_path);

        let static_dir = std::env::var("STATIC_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            backend_url,
            backend_timeout_secs,
            backend_start_timeout_secs,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            poll_interval_ms,
            stream_refresh_ms,
            job_timeout_secs,
            default_industry,
            focus_areas,
            artifact_path,
            static_dir,
        }
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// `None` when the start call may run as long as the analysis does.
    pub fn backend_start_timeout(&self) -> Option<Duration> {
        (self.backend_start_timeout_secs > 0)
            .then(|| Duration::from_secs(self.backend_start_timeout_secs))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stream_refresh(&self) -> Duration {
        Duration::from_millis(self.stream_refresh_ms)
    }

    /// `None` when the lifetime cap is disabled.
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == ANY_ORIGIN)
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid number: {e}")),
        Err(_) => default,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
