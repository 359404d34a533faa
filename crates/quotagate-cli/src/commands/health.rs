//! Utilization service health command.

use chrono::Utc;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use quotagate_core::error::AppError;

/// Health check display row
#[derive(Debug, Serialize, Tabled)]
struct HealthRow {
    /// Configured backend
    backend: String,
    /// Availability after the check
    available: bool,
    /// Health-check interval used by the daemon
    interval: String,
    /// When the check ran
    checked_at: String,
}

/// Run one health check and report availability.
pub async fn execute(config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (client, metrics) = super::create_client(&config)?;

    let available = client.check_health().await;
    tracing::debug!(snapshot = ?metrics.snapshot(), "Health check finished");

    let row = HealthRow {
        backend: config.quota.backend.clone(),
        available,
        interval: format!("{:?}", config.utilization.health_check_interval()),
        checked_at: Utc::now().to_rfc3339(),
    };
    output::print_row(&row, format);

    if available {
        Ok(())
    } else {
        Err(AppError::service_unavailable(format!(
            "Utilization backend '{}' is unavailable",
            config.quota.backend
        )))
    }
}
