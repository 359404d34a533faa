//! Bucket and account quota evaluation for one authorization action.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use quotagate_core::error::AppError;
use quotagate_core::result::AppResult;
use quotagate_core::traits::reporter::MetricsReporter;
use quotagate_core::traits::utilization::UtilizationServiceClient;
use quotagate_core::types::metric::{MetricsRequestBody, ResourceType};
use quotagate_entity::quota::{Quota, QuotaScope};

/// The resources whose quotas apply to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaTarget {
    /// Bucket name, for logs.
    pub bucket_name: String,
    /// Bucket name in the utilization service (`<name>_<creationMillis>`).
    pub bucket_resource: String,
    /// Bucket quota in bytes; `<= 0` means none.
    pub bucket_quota: i64,
    /// Owning account identifier, if known.
    pub account: Option<String>,
    /// Account quota in bytes; `<= 0` means none.
    pub account_quota: i64,
}

/// One action-name evaluation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCheck {
    /// Authorization action name, sent to the utilization service.
    pub action: String,
    /// Signed inflight bytes for this action.
    pub inflight: i64,
    /// Whether the inflight is reported to the service, which then
    /// includes it in the returned totals.
    pub send_inflight: bool,
    /// Whether the inflight is space being released rather than consumed.
    pub is_storage_reserved: bool,
}

impl ActionCheck {
    /// Body of the utilization request.
    pub fn body(&self) -> MetricsRequestBody {
        let inflight = self.send_inflight.then_some(self.inflight);
        MetricsRequestBody::new(self.action.clone(), inflight)
    }

    /// Bytes added locally to the observed total before comparing it
    /// with the quota. Zero when the service already counted them.
    pub fn inflight_for_comparison(&self) -> i64 {
        if self.send_inflight { 0 } else { self.inflight }
    }

    /// The compensating check that releases this reservation.
    pub fn rollback(&self) -> Self {
        Self {
            action: self.action.clone(),
            inflight: self.inflight.saturating_neg(),
            send_inflight: self.send_inflight,
            is_storage_reserved: false,
        }
    }

    fn sign(&self) -> i64 {
        if self.is_storage_reserved { -1 } else { 1 }
    }
}

/// Result of evaluating one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationOutcome {
    /// The bucket quota would be exceeded.
    pub bucket_exceeded: bool,
    /// The account quota would be exceeded.
    pub account_exceeded: bool,
    /// At least one metric was too old to be trusted.
    pub stale: bool,
}

impl EvaluationOutcome {
    /// Whether any quota would be exceeded.
    pub fn is_exceeded(&self) -> bool {
        self.bucket_exceeded || self.account_exceeded
    }

    /// Combine two outcomes; any exceeded flag wins.
    pub fn merge(self, other: Self) -> Self {
        Self {
            bucket_exceeded: self.bucket_exceeded || other.bucket_exceeded,
            account_exceeded: self.account_exceeded || other.account_exceeded,
            stale: self.stale || other.stale,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ResourceOutcome {
    exceeded: bool,
    stale: bool,
    reserved: bool,
}

/// Decides whether the bucket and account quotas would be exceeded by
/// one action, querying the utilization service for both concurrently.
#[derive(Clone)]
pub struct QuotaEvaluator {
    client: Arc<dyn UtilizationServiceClient>,
    reporter: Arc<dyn MetricsReporter>,
}

impl fmt::Debug for QuotaEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaEvaluator")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl QuotaEvaluator {
    /// Create an evaluator.
    pub fn new(client: Arc<dyn UtilizationServiceClient>, reporter: Arc<dyn MetricsReporter>) -> Self {
        Self { client, reporter }
    }

    /// The utilization client used by this evaluator.
    pub fn client(&self) -> &Arc<dyn UtilizationServiceClient> {
        &self.client
    }

    /// Evaluate `check` against the quotas of `target`.
    ///
    /// A fetch error from either resource aborts the evaluation with that
    /// error, after releasing whatever the other resource reserved. Quotas
    /// that are not configured are not queried.
    pub async fn evaluate(&self, target: &QuotaTarget, check: &ActionCheck) -> AppResult<EvaluationOutcome> {
        let bucket = async {
            let quota = Quota::new(QuotaScope::Bucket, target.bucket_quota);
            if !quota.is_configured() {
                return Ok(ResourceOutcome::default());
            }
            self.check_resource(ResourceType::Bucket, &target.bucket_resource, quota, check)
                .await
        };

        let account = async {
            let quota = Quota::new(QuotaScope::Account, target.account_quota);
            match target.account.as_deref() {
                Some(account) if quota.is_configured() => {
                    self.check_resource(ResourceType::Account, account, quota, check)
                        .await
                }
                _ => Ok(ResourceOutcome::default()),
            }
        };

        let (bucket, account) = match tokio::join!(bucket, account) {
            (Ok(bucket), Ok(account)) => (bucket, account),
            (Err(e), Ok(account)) => {
                if account.reserved {
                    if let Some(name) = target.account.as_deref() {
                        self.release_partial(ResourceType::Account, name, check).await;
                    }
                }
                return Err(e);
            }
            (Ok(bucket), Err(e)) => {
                if bucket.reserved {
                    self.release_partial(ResourceType::Bucket, &target.bucket_resource, check)
                        .await;
                }
                return Err(e);
            }
            (Err(e), Err(_)) => return Err(e),
        };

        Ok(EvaluationOutcome {
            bucket_exceeded: bucket.exceeded,
            account_exceeded: account.exceeded,
            stale: bucket.stale || account.stale,
        })
    }

    /// Re-issue the utilization calls of `check` without evaluating the
    /// answers. Used with [`ActionCheck::rollback`] to release a reservation.
    pub async fn release(&self, target: &QuotaTarget, check: &ActionCheck) -> AppResult<()> {
        let body = check.body();

        let bucket = async {
            if target.bucket_quota > 0 {
                self.client
                    .get_utilization_metrics(ResourceType::Bucket, &target.bucket_resource, &body)
                    .await?;
            }
            Ok::<_, AppError>(())
        };

        let account = async {
            if let Some(account) = target.account.as_deref().filter(|_| target.account_quota > 0) {
                self.client
                    .get_utilization_metrics(ResourceType::Account, account, &body)
                    .await?;
            }
            Ok::<_, AppError>(())
        };

        tokio::try_join!(bucket, account)?;
        Ok(())
    }

    async fn release_partial(&self, resource_type: ResourceType, resource_name: &str, check: &ActionCheck) {
        let body = check.rollback().body();
        if let Err(e) = self
            .client
            .get_utilization_metrics(resource_type, resource_name, &body)
            .await
        {
            warn!(
                error = %e,
                resource_type = %resource_type,
                resource_name,
                action = %check.action,
                inflight = check.inflight,
                "Error deleting inflights after a failed evaluation, reservation may leak"
            );
        }
    }

    async fn check_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        quota: Quota,
        check: &ActionCheck,
    ) -> AppResult<ResourceOutcome> {
        let metric = self
            .client
            .get_utilization_metrics(resource_type, resource_name, &check.body())
            .await?;

        let reserved = check.send_inflight && check.inflight != 0;
        // A release cannot be folded into a local comparison.
        if check.inflight_for_comparison() < 0 {
            return Err(AppError::validation(format!(
                "cannot compare negative inflight {} for action '{}' without reporting it",
                check.inflight, check.action
            )));
        }

        if metric.is_stale(self.client.max_staleness(), Utc::now()) {
            warn!(
                resource_type = %resource_type,
                resource_name,
                action = %check.action,
                date = ?metric.date,
                "Utilization metrics are stale, not enforcing quota"
            );
            self.reporter.inc_request_with_quota_metrics_unavailable();
            return Ok(ResourceOutcome {
                exceeded: false,
                stale: true,
                reserved,
            });
        }

        let inflight = check.inflight_for_comparison() * check.sign();
        let exceeded = quota.would_exceed(metric.bytes_total, inflight);
        if exceeded {
            debug!(
                resource_type = %resource_type,
                resource_name,
                action = %check.action,
                inflight = check.inflight,
                quota = quota.limit_bytes,
                bytes_total = metric.bytes_total,
                "Quota exceeded"
            );
        }

        Ok(ResourceOutcome {
            exceeded,
            stale: false,
            reserved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotagate_core::metrics::QuotaMetrics;
    use quotagate_core::types::metric::UtilizationMetric;
    use quotagate_utilization::UtilizationClient;
    use quotagate_utilization::client::ClientSettings;
    use quotagate_utilization::memory::MemoryUtilizationBackend;
    use std::time::Duration;

    const BUCKET: &str = "bucketName_1640995200000";
    const MAX_STALENESS: Duration = Duration::from_secs(24 * 60 * 60);

    fn setup() -> (QuotaEvaluator, Arc<MemoryUtilizationBackend>, Arc<QuotaMetrics>) {
        let backend = Arc::new(MemoryUtilizationBackend::new());
        let metrics = Arc::new(QuotaMetrics::new());
        let client = UtilizationClient::new(
            backend.clone(),
            metrics.clone(),
            ClientSettings {
                max_staleness: MAX_STALENESS,
                request_timeout: Duration::from_secs(5),
                health_check_interval: Duration::from_secs(60),
            },
        );
        let evaluator = QuotaEvaluator::new(Arc::new(client), metrics.clone());
        (evaluator, backend, metrics)
    }

    fn target(bucket_quota: i64, account_quota: i64) -> QuotaTarget {
        QuotaTarget {
            bucket_name: "bucketName".to_string(),
            bucket_resource: BUCKET.to_string(),
            bucket_quota,
            account: Some("account".to_string()),
            account_quota,
        }
    }

    fn check(inflight: i64, send_inflight: bool) -> ActionCheck {
        ActionCheck {
            action: "objectPut".to_string(),
            inflight,
            send_inflight,
            is_storage_reserved: false,
        }
    }

    #[tokio::test]
    async fn test_bucket_exceeded_account_within_quota() {
        let (evaluator, backend, _) = setup();
        backend.set_bytes(ResourceType::Bucket, BUCKET, 150);
        backend.set_bytes(ResourceType::Account, "account", 120);

        let outcome = evaluator
            .evaluate(&target(100, 1000), &check(1, false))
            .await
            .unwrap();
        assert!(outcome.bucket_exceeded);
        assert!(!outcome.account_exceeded);
        assert!(outcome.is_exceeded());
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_local_inflight_counts_toward_threshold() {
        let (evaluator, backend, _) = setup();
        backend.set_bytes(ResourceType::Bucket, BUCKET, 90);

        let outcome = evaluator
            .evaluate(&target(100, 0), &check(20, false))
            .await
            .unwrap();
        assert!(outcome.bucket_exceeded);

        let outcome = evaluator
            .evaluate(&target(100, 0), &check(10, false))
            .await
            .unwrap();
        assert!(!outcome.bucket_exceeded);
    }

    #[tokio::test]
    async fn test_sent_inflight_is_not_added_twice() {
        let (evaluator, backend, _) = setup();
        backend.set_bytes(ResourceType::Bucket, BUCKET, 90);

        let outcome = evaluator
            .evaluate(&target(100, 0), &check(20, true))
            .await
            .unwrap();
        assert!(!outcome.bucket_exceeded);
        assert_eq!(backend.calls()[0].body.inflight, Some(20));
    }

    #[tokio::test]
    async fn test_unconfigured_quotas_are_not_queried() {
        let (evaluator, backend, _) = setup();
        let mut no_account = target(100, 1000);
        no_account.account = None;

        evaluator.evaluate(&no_account, &check(1, false)).await.unwrap();
        evaluator.evaluate(&target(0, 1000), &check(1, false)).await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].resource_type, ResourceType::Bucket);
        assert_eq!(calls[1].resource_type, ResourceType::Account);
    }

    #[tokio::test]
    async fn test_sent_negative_inflight_still_compares() {
        let (evaluator, backend, _) = setup();
        backend.set_bytes(ResourceType::Bucket, BUCKET, 500);

        let outcome = evaluator
            .evaluate(&target(100, 0), &check(-50, true))
            .await
            .unwrap();
        assert!(outcome.bucket_exceeded);
        assert_eq!(backend.calls()[0].body.inflight, Some(-50));
    }

    #[tokio::test]
    async fn test_local_negative_inflight_is_an_error() {
        let (evaluator, backend, _) = setup();
        backend.set_bytes(ResourceType::Bucket, BUCKET, 500);

        let err = evaluator
            .evaluate(&target(100, 0), &check(-50, false))
            .await
            .unwrap_err();
        assert_eq!(err.kind, quotagate_core::error::ErrorKind::Validation);
        assert!(backend.calls().iter().all(|c| c.body.inflight.is_none()));
    }

    #[tokio::test]
    async fn test_storage_reserved_subtracts_inflight() {
        let (evaluator, backend, _) = setup();
        backend.set_bytes(ResourceType::Bucket, BUCKET, 120);
        let mut reserved = check(30, false);
        reserved.is_storage_reserved = true;

        let outcome = evaluator.evaluate(&target(100, 0), &reserved).await.unwrap();
        assert!(!outcome.bucket_exceeded);
    }

    #[tokio::test]
    async fn test_stale_metric_is_permissive_and_counted_once() {
        let (evaluator, backend, metrics) = setup();
        let stale_by_one_ms = chrono::Duration::from_std(MAX_STALENESS).unwrap()
            + chrono::Duration::milliseconds(1);
        backend.set_metric(
            ResourceType::Bucket,
            BUCKET,
            UtilizationMetric {
                bytes_total: 1_000,
                objects_total: None,
                date: Some(Utc::now() - stale_by_one_ms),
            },
        );

        let outcome = evaluator
            .evaluate(&target(100, 0), &check(1, false))
            .await
            .unwrap();
        assert!(!outcome.is_exceeded());
        assert!(outcome.stale);
        assert_eq!(metrics.snapshot().request_with_quota_metrics_unavailable, 1);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let (evaluator, backend, _) = setup();
        backend.fail_metrics("connection refused", None);

        let err = evaluator
            .evaluate(&target(100, 1000), &check(1, false))
            .await
            .unwrap_err();
        assert_eq!(err.message, "connection refused");
    }

    #[tokio::test]
    async fn test_failed_sibling_releases_bucket_reservation() {
        let (evaluator, backend, _) = setup();
        backend.fail_metrics_for(ResourceType::Account, "account lookup failed");

        let err = evaluator
            .evaluate(&target(100, 1000), &check(25, true))
            .await
            .unwrap_err();
        assert_eq!(err.message, "account lookup failed");

        let bucket_inflights: Vec<_> = backend
            .calls()
            .into_iter()
            .filter(|c| c.resource_type == ResourceType::Bucket)
            .map(|c| c.body.inflight)
            .collect();
        assert_eq!(bucket_inflights, vec![Some(25), Some(-25)]);
    }

    #[tokio::test]
    async fn test_failed_sibling_without_reservation_makes_no_release() {
        let (evaluator, backend, _) = setup();
        backend.fail_metrics_for(ResourceType::Account, "account lookup failed");

        evaluator
            .evaluate(&target(100, 1000), &check(25, false))
            .await
            .unwrap_err();
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_repeated_evaluation_is_stable() {
        let (evaluator, backend, _) = setup();
        backend.set_bytes(ResourceType::Bucket, BUCKET, 99);

        let first = evaluator.evaluate(&target(100, 0), &check(2, false)).await.unwrap();
        let second = evaluator.evaluate(&target(100, 0), &check(2, false)).await.unwrap();
        assert_eq!(first, second);
        assert!(first.bucket_exceeded);
    }

    #[tokio::test]
    async fn test_release_reissues_reversed_calls() {
        let (evaluator, backend, _) = setup();
        let reservation = check(25, true);

        evaluator
            .release(&target(100, 1000), &reservation.rollback())
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.body.inflight == Some(-25)));
    }

    #[test]
    fn test_rollback_check_flips_inflight() {
        let mut original = check(40, true);
        original.is_storage_reserved = true;
        let rollback = original.rollback();
        assert_eq!(rollback.inflight, -40);
        assert!(!rollback.is_storage_reserved);
        assert_eq!(rollback.body(), original.body().reversed());
    }

    #[test]
    fn test_rollback_of_minimum_inflight_saturates() {
        assert_eq!(check(i64::MIN, true).rollback().inflight, i64::MAX);
    }
}
