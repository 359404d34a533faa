//! Observability sink for quota evaluation.

use std::time::Duration;

/// Receives quota duration and outcome metrics.
///
/// The quota subsystem only reports into this trait; exporting the values
/// (Prometheus or otherwise) belongs to the implementor.
pub trait MetricsReporter: Send + Sync + std::fmt::Debug + 'static {
    /// Record the total time spent evaluating quotas for one API call.
    fn observe_quota_evaluation(&self, action: &str, quota_type: &str, code: u16, duration: Duration);

    /// Record the duration of one utilization metrics retrieval.
    fn observe_utilization_retrieval(&self, code: u16, class: &str, duration: Duration);

    /// Set the utilization service availability gauge.
    fn set_utilization_service_available(&self, available: bool);

    /// Count a request whose configured quota could not be checked.
    fn inc_request_with_quota_metrics_unavailable(&self);
}
