//! CLI command definitions and dispatch.

pub mod check;
pub mod config;
pub mod health;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use quotagate_core::config::AppConfig;
use quotagate_core::error::AppError;
use quotagate_core::metrics::QuotaMetrics;
use quotagate_core::traits::utilization::UtilizationServiceClient;

/// QuotaGate: storage quota admission control
#[derive(Debug, Parser)]
#[command(name = "quotagate-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one health check against the utilization service
    Health,
    /// Run one quota admission check
    Check(check::CheckArgs),
    /// Show the effective configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Health => health::execute(&self.config, self.format).await,
            Commands::Check(args) => check::execute(args, &self.config, self.format).await,
            Commands::Config => config::execute(&self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_from(config_path)
}

/// Helper: build the configured utilization client with fresh metrics
pub fn create_client(
    config: &AppConfig,
) -> Result<(Arc<dyn UtilizationServiceClient>, Arc<QuotaMetrics>), AppError> {
    let metrics = Arc::new(QuotaMetrics::new());
    let client = quotagate_utilization::create_utilization_client(config, metrics.clone())?;
    Ok((client, metrics))
}
