//! Brokerage Engine Binary
//!
//! Starts the KIS automation engine.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin brokerage-engine
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `SYNC_API_KEY`: Shared secret for the token sync endpoint
//!
//! ## Optional
//! - `PRIMARY_API_URL`: Primary deployment; enables secondary mode
//! - `SCHEDULER_ENABLED`: Run the job timer (default: true)
//! - `APP_ENV`: dev | prd (default: dev)
//! - `HTTP_PORT`: API port (default: 8000)
//! - `KIS_BASE_URL`, `KIS_WS_URL`, `KIS_HTTP_TIMEOUT_SECS`
//! - `SCHEDULER_TIMEZONE`: IANA zone (default: Asia/Seoul)
//! - `KIS_APP_KEY`, `KIS_APP_SECRET`, `KIS_ACCOUNT_NO`, `KIS_PRODUCT_CODE`, `KIS_HTS_ID`:
//!   bootstrap account
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use brokerage_engine::domain::shared::AccountId;
use brokerage_engine::infrastructure::config::{
    BOOTSTRAP_ACCOUNT_ID, EngineConfig, EngineContainer,
};
use brokerage_engine::infrastructure::http::create_router;
use brokerage_engine::infrastructure::metrics::init_metrics;
use brokerage_engine::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Time allowed for the scheduler to finish its current job.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS operations
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    load_dotenv();
    let _telemetry = init_telemetry();

    tracing::info!("Starting Brokerage Engine");

    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Metrics recorder not installed, /metrics will be empty");
    }

    let config = EngineConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown = CancellationToken::new();
    let container = EngineContainer::from_config(&config, shutdown.clone())
        .context("failed to wire engine components")?;

    register_bootstrap_account(&config, &container).await;

    let scheduler = container.scheduler(&config);
    let scheduler_handle = if config.scheduler_enabled {
        tracing::info!(jobs = scheduler.jobs().len(), "Scheduler started");
        let scheduler = std::sync::Arc::clone(&scheduler);
        Some(tokio::spawn(scheduler.run(shutdown.clone())))
    } else {
        tracing::info!("Scheduler disabled (SCHEDULER_ENABLED=false)");
        None
    };

    let state = container.app_state(&config, scheduler, env!("CARGO_PKG_VERSION"));
    let app = create_router(state);

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind {http_addr}"))?;
    tracing::info!(%http_addr, "HTTP server listening");

    tracing::info!("Brokerage engine ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("HTTP server error")?;

    shutdown.cancel();
    container.relay().disconnect();
    await_scheduler(scheduler_handle).await;

    tracing::info!("Brokerage engine stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &EngineConfig) {
    tracing::info!(
        environment = config.environment.as_str(),
        http_port = config.http_port,
        scheduler_enabled = config.scheduler_enabled,
        secondary_mode = config.is_secondary(),
        timezone = %config.timezone,
        kis_base_url = %config.kis_base_url,
        "Configuration loaded"
    );
    if let Some(primary) = &config.primary_api_url {
        tracing::info!(primary_api_url = %primary, "Secondary mode: tokens come from the primary");
    }
}

/// Load the bootstrap account into the vault, if configured.
async fn register_bootstrap_account(config: &EngineConfig, container: &EngineContainer) {
    let Some(bootstrap) = &config.bootstrap else {
        tracing::info!("No bootstrap account configured");
        return;
    };
    match container
        .sessions()
        .register_account(
            AccountId::new(BOOTSTRAP_ACCOUNT_ID),
            bootstrap.credentials.clone(),
            bootstrap.feed_key.clone(),
        )
        .await
    {
        Ok(session) => tracing::info!(
            account_id = %session.account_id(),
            "Bootstrap account registered"
        ),
        Err(e) => tracing::error!(error = %e, "Bootstrap account registration failed"),
    }
}

/// Give the scheduler a bounded window to finish.
async fn await_scheduler(handle: Option<JoinHandle<()>>) {
    let Some(handle) = handle else { return };
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
        Ok(Ok(())) => tracing::info!("Scheduler stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Scheduler task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Scheduler did not stop in time"
        ),
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for SIGTERM, SIGINT or an internal cancellation.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown.cancelled() => {}
    }

    shutdown.cancel();
    tracing::info!("Graceful shutdown started");
}
