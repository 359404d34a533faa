//! Quota admission gate for API requests.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, warn};

use quotagate_core::config::QuotaConfig;
use quotagate_core::error::AppError;
use quotagate_core::result::AppResult;
use quotagate_core::traits::reporter::MetricsReporter;
use quotagate_core::traits::utilization::UtilizationServiceClient;
use quotagate_entity::account::AccountInfo;
use quotagate_entity::action::{
    action_need_quota_check, action_need_quota_check_copy, action_with_data_deletion,
};
use quotagate_entity::bucket::BucketInfo;

use crate::context::RequestContext;

use super::decision::{DegradedReason, QuotaDecision, QuotaType};
use super::evaluator::{ActionCheck, EvaluationOutcome, QuotaEvaluator, QuotaTarget};

/// Decides whether an API request may consume storage.
///
/// Only a quota denial is returned as an error. Every failure of the
/// utilization service lets the request through as
/// [`QuotaDecision::AllowedDegraded`].
#[derive(Clone)]
pub struct QuotaGate {
    config: QuotaConfig,
    evaluator: QuotaEvaluator,
    reporter: Arc<dyn MetricsReporter>,
}

impl fmt::Debug for QuotaGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaGate")
            .field("config", &self.config)
            .field("evaluator", &self.evaluator)
            .finish_non_exhaustive()
    }
}

impl QuotaGate {
    /// Create a gate over `client`.
    pub fn new(
        config: QuotaConfig,
        client: Arc<dyn UtilizationServiceClient>,
        reporter: Arc<dyn MetricsReporter>,
    ) -> Self {
        Self {
            config,
            evaluator: QuotaEvaluator::new(client, reporter.clone()),
            reporter,
        }
    }

    /// The quota configuration in effect.
    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Check the bucket and account quotas for an API call.
    ///
    /// `action_names` are the authorization actions of `api_method`;
    /// `inflight` is the signed byte delta of the call (see
    /// [`process_bytes_to_write`](super::process_bytes_to_write)). For every
    /// action evaluated, a finalizer is registered on `ctx` that releases
    /// the reservation if the API call fails and records the evaluation
    /// duration.
    #[allow(clippy::too_many_arguments)]
    pub async fn validate_quotas(
        &self,
        ctx: &mut RequestContext,
        bucket: &dyn BucketInfo,
        account: Option<&AccountInfo>,
        action_names: &[&str],
        api_method: &str,
        inflight: i64,
        is_storage_reserved: bool,
    ) -> AppResult<QuotaDecision> {
        if !self.config.is_quota_enabled() || inflight == 0 {
            return Ok(QuotaDecision::Allowed);
        }

        let started = Instant::now();
        let bucket_quota = bucket.quota();
        let account_quota = account.map_or(0, |a| a.quota);
        let is_deletion = action_with_data_deletion(api_method);
        let quota_type = QuotaType::classify(bucket_quota, account_quota, is_deletion);

        if bucket_quota <= 0 && account_quota <= 0 {
            return Ok(QuotaDecision::Allowed);
        }
        if !self.evaluator.client().is_enabled() {
            warn!(
                bucket = bucket.name(),
                request_id = %ctx.request_id,
                "Quota is set for a bucket, but the quota service is disabled"
            );
            self.reporter.inc_request_with_quota_metrics_unavailable();
            return Ok(QuotaDecision::AllowedDegraded(DegradedReason::ServiceDisabled));
        }

        let bucket_resource = match bucket.utilization_resource_name() {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "Cannot resolve bucket utilization name, allowing the request");
                return Ok(QuotaDecision::AllowedDegraded(DegradedReason::MetricsUnavailable {
                    error: e.to_string(),
                }));
            }
        };
        let target = QuotaTarget {
            bucket_name: bucket.name().to_string(),
            bucket_resource,
            bucket_quota,
            account: account.map(|a| a.account.clone()),
            account_quota,
        };

        let checks: Vec<ActionCheck> = action_names
            .iter()
            .filter_map(|action| self.action_check(action, api_method, inflight, is_storage_reserved))
            .collect();

        let results = join_all(
            checks
                .iter()
                .map(|check| self.evaluator.evaluate(&target, check)),
        )
        .await;
        let check_duration = started.elapsed();

        let mut outcome = EvaluationOutcome::default();
        let mut failure: Option<AppError> = None;
        let mut evaluated = Vec::with_capacity(checks.len());
        for (check, result) in checks.into_iter().zip(results) {
            match result {
                Ok(action_outcome) => {
                    outcome = outcome.merge(action_outcome);
                    evaluated.push(check);
                }
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        let code = if outcome.is_exceeded() { 429 } else { 200 };
        for check in evaluated {
            self.register_finalizer(ctx, &target, check, api_method, quota_type, code, check_duration);
        }

        if let Some(e) = failure {
            warn!(
                error = %e,
                kind = %e.kind,
                api_method,
                "Error getting metrics from the quota service, allowing the request"
            );
            return Ok(QuotaDecision::AllowedDegraded(DegradedReason::MetricsUnavailable {
                error: e.to_string(),
            }));
        }

        if !is_deletion && outcome.is_exceeded() {
            return Err(AppError::quota_exceeded(format!(
                "{} quota exceeded for bucket '{}'",
                if outcome.bucket_exceeded { "Bucket" } else { "Account" },
                target.bucket_name
            )));
        }

        if outcome.stale {
            return Ok(QuotaDecision::AllowedDegraded(DegradedReason::StaleMetrics));
        }
        Ok(QuotaDecision::Allowed)
    }

    /// The evaluation of `action`, or `None` when the action neither
    /// writes nor deletes data.
    fn action_check(
        &self,
        action: &str,
        api_method: &str,
        inflight: i64,
        is_storage_reserved: bool,
    ) -> Option<ActionCheck> {
        // The source read of a copy carries the copied bytes and must not
        // be mistaken for a replacement.
        let inflight = if action_need_quota_check_copy(action, api_method) {
            inflight.saturating_abs()
        } else if action_need_quota_check(action) || action_with_data_deletion(action) {
            inflight
        } else {
            return None;
        };

        Some(ActionCheck {
            action: action.to_string(),
            inflight,
            send_inflight: self.config.is_quota_inflight_enabled(),
            is_storage_reserved,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn register_finalizer(
        &self,
        ctx: &mut RequestContext,
        target: &QuotaTarget,
        check: ActionCheck,
        api_method: &str,
        quota_type: QuotaType,
        code: u16,
        check_duration: Duration,
    ) {
        let evaluator = self.evaluator.clone();
        let reporter = self.reporter.clone();
        let target = target.clone();
        let api_method = api_method.to_string();

        ctx.push_finalizer(move |api_error: Option<AppError>| async move {
            let cleanup_started = Instant::now();
            if let Some(api_error) = api_error {
                debug!(
                    action = %check.action,
                    inflight = check.inflight,
                    error = %api_error,
                    "API call failed, releasing inflight bytes"
                );
                if let Err(e) = evaluator.release(&target, &check.rollback()).await {
                    warn!(
                        error = %e,
                        action = %check.action,
                        "Error deleting inflights from the quota service"
                    );
                }
            }
            reporter.observe_quota_evaluation(
                &api_method,
                quota_type.as_str(),
                code,
                check_duration + cleanup_started.elapsed(),
            );
        });
    }
}
