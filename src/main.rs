//! QuotaGate daemon: storage quota admission control.
//!
//! Wires configuration, logging and the utilization client together and
//! keeps the utilization service health check running until shutdown.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use quotagate_core::config::AppConfig;
use quotagate_core::error::AppError;
use quotagate_core::metrics::QuotaMetrics;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("QuotaGate error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("QUOTAGATE_CONFIG") {
        Ok(path) => AppConfig::load_from(&path),
        Err(_) => {
            let env = std::env::var("QUOTAGATE_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Start the utilization client and report availability until shutdown
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting QuotaGate v{}", env!("CARGO_PKG_VERSION"));

    if !config.quota.is_quota_enabled() {
        tracing::warn!("Quota evaluation is disabled by configuration");
    }

    let metrics = Arc::new(QuotaMetrics::new());
    let client = quotagate_utilization::create_utilization_client(&config, metrics.clone())?;
    client.start();

    let interval = config.utilization.health_check_interval();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately, before the first check has answered.
    ticker.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let snapshot = metrics.snapshot();
                tracing::info!(
                    backend = %config.quota.backend,
                    available = client.is_enabled(),
                    unavailable_checks = snapshot.request_with_quota_metrics_unavailable,
                    "Utilization service status"
                );
            }
        }
    }

    tracing::info!("Shutdown signal received, stopping health checks...");
    client.stop();

    tracing::info!("QuotaGate shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
