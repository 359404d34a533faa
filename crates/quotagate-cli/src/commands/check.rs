//! One-off quota admission check.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use quotagate_core::error::AppError;
use quotagate_entity::{AccountInfo, Bucket};
use quotagate_service::{QuotaDecision, QuotaGate, RequestContext};

/// Arguments for the check command
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Bucket name
    #[arg(long)]
    pub bucket: String,
    /// Bucket creation date (ISO-8601)
    #[arg(long)]
    pub bucket_created: String,
    /// Bucket quota in bytes (0 for none)
    #[arg(long, default_value_t = 0)]
    pub bucket_quota: i64,
    /// Whether the bucket is versioned
    #[arg(long)]
    pub versioned: bool,
    /// Owning account identifier
    #[arg(long)]
    pub account: Option<String>,
    /// Account quota in bytes (0 for none)
    #[arg(long, default_value_t = 0)]
    pub account_quota: i64,
    /// API method being admitted
    #[arg(long, default_value = "objectPut")]
    pub api_method: String,
    /// Authorization actions of the API method
    #[arg(long = "action", required = true)]
    pub actions: Vec<String>,
    /// Signed inflight bytes
    #[arg(long, allow_hyphen_values = true)]
    pub inflight: i64,
    /// The inflight releases reserved storage
    #[arg(long)]
    pub storage_reserved: bool,
    /// Release the reservation after the check
    #[arg(long)]
    pub release: bool,
    /// Print the metrics recorded by the check
    #[arg(long)]
    pub show_metrics: bool,
}

/// Decision display row
#[derive(Debug, Serialize, Tabled)]
struct DecisionRow {
    /// API method
    api_method: String,
    /// Bucket
    bucket: String,
    /// Inflight bytes
    inflight: i64,
    /// Outcome
    decision: String,
    /// Details
    detail: String,
}

/// Execute the check command
pub async fn execute(args: &CheckArgs, config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (client, metrics) = super::create_client(&config)?;
    client.check_health().await;

    let gate = QuotaGate::new(config.quota.clone(), client, metrics.clone());
    let bucket = Bucket::new(&args.bucket, &args.bucket_created, args.bucket_quota)
        .with_versioning(args.versioned);
    let account = args
        .account
        .as_ref()
        .map(|id| AccountInfo::new(id, args.account_quota));
    let actions: Vec<&str> = args.actions.iter().map(String::as_str).collect();

    let mut ctx = RequestContext::new(&args.api_method);
    let result = gate
        .validate_quotas(
            &mut ctx,
            &bucket,
            account.as_ref(),
            &actions,
            &args.api_method,
            args.inflight,
            args.storage_reserved,
        )
        .await;

    let (decision, detail) = match &result {
        Ok(QuotaDecision::Allowed) => ("allowed".to_string(), String::new()),
        Ok(QuotaDecision::AllowedDegraded(reason)) => (
            "allowed (degraded)".to_string(),
            serde_json::to_string(reason)?,
        ),
        Err(e) => ("denied".to_string(), e.message.clone()),
    };

    let api_error = match (&result, args.release) {
        (Err(e), _) => Some(e.clone()),
        (Ok(_), true) => Some(AppError::internal("released by operator")),
        (Ok(_), false) => None,
    };
    ctx.finalize(api_error.as_ref()).await;

    let row = DecisionRow {
        api_method: args.api_method.clone(),
        bucket: args.bucket.clone(),
        inflight: args.inflight,
        decision,
        detail,
    };
    output::print_row(&row, format);
    if args.show_metrics {
        output::print_item(&metrics.snapshot(), format);
    }

    match result {
        Err(e) if !e.is_quota_exceeded() => Err(e),
        _ => Ok(()),
    }
}
