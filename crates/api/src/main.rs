use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relay_backend::{AnalysisBackend, HttpBackend};
use relay_events::JobStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_api::config::ServerConfig;
use relay_api::engine::{DriverSettings, JobDriver, ReportBuilder};
use relay_api::router::build_app_router;
use relay_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relay_api=debug,relay_events=info,relay_backend=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Analysis service client ---
    let backend: Arc<dyn AnalysisBackend> = Arc::new(
        HttpBackend::new(config.backend_url.clone(), config.backend_timeout())
            .expect("Failed to build analysis service client")
            .with_start_timeout(config.backend_start_timeout()),
    );
    tracing::info!(backend_url = %config.backend_url, "Analysis service client created");

    if let Err(e) = backend.health().await {
        tracing::warn!(error = %e, "Analysis service not reachable yet, continuing");
    }

    // --- Job store and driver ---
    let store = Arc::new(JobStore::new());
    let driver = Arc::new(JobDriver::new(
        Arc::clone(&backend),
        Arc::clone(&store),
        ReportBuilder::markdown(Some(config.artifact_path.clone())),
        DriverSettings::from(&config),
    ));
    tracing::info!(
        poll_interval_ms = config.poll_interval_ms,
        job_timeout_secs = config.job_timeout_secs,
        "Job driver ready",
    );

    // --- App state ---
    let shutdown = CancellationToken::new();
    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::clone(&store),
        driver: Arc::clone(&driver),
        backend,
        shutdown: shutdown.clone(),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Open event streams would otherwise hold the drain open.
            shutdown.cancel();
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if !driver
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await
    {
        tracing::warn!("Some job poll loops did not stop in time");
    }

    store.clear().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
