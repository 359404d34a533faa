//! Configuration display command.

use crate::output::{self, OutputFormat};
use quotagate_core::error::AppError;

/// Print the effective configuration, including the resolved
/// health-check interval.
pub async fn execute(config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    output::print_item(&config, format);
    if format == OutputFormat::Table {
        println!(
            "Health check every {:?}, quotas {}",
            config.utilization.health_check_interval(),
            if config.quota.is_quota_enabled() { "enabled" } else { "disabled" }
        );
    }
    Ok(())
}
