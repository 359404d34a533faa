//! In-process quota metrics.

pub mod durations;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use self::durations::{DurationStats, EvaluationLabels, RetrievalLabels};
use crate::traits::reporter::MetricsReporter;

/// Quota subsystem counters, gauges and labelled duration summaries.
#[derive(Debug, Default)]
pub struct QuotaMetrics {
    /// `quota_evaluation_duration_seconds{action,type,code}`
    quota_evaluation: DashMap<EvaluationLabels, DurationStats>,
    /// `utilization_metrics_retrieval_duration_seconds{code,class}`
    utilization_retrieval: DashMap<RetrievalLabels, DurationStats>,
    /// `utilization_service_available`
    service_available: AtomicU64,
    /// `request_with_quota_metrics_unavailable`
    metrics_unavailable: AtomicU64,
}

impl QuotaMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut quota_evaluation: Vec<_> = self
            .quota_evaluation
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        quota_evaluation.sort_by(|a, b| a.0.cmp(&b.0));

        let mut utilization_retrieval: Vec<_> = self
            .utilization_retrieval
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        utilization_retrieval.sort_by(|a, b| a.0.cmp(&b.0));

        MetricsSnapshot {
            quota_evaluation,
            utilization_retrieval,
            utilization_service_available: self.service_available.load(Ordering::Relaxed) == 1,
            request_with_quota_metrics_unavailable: self.metrics_unavailable.load(Ordering::Relaxed),
        }
    }
}

impl MetricsReporter for QuotaMetrics {
    fn observe_quota_evaluation(&self, action: &str, quota_type: &str, code: u16, duration: Duration) {
        let labels = EvaluationLabels::new(action, quota_type, code);
        self.quota_evaluation
            .entry(labels)
            .or_default()
            .observe(duration);
    }

    fn observe_utilization_retrieval(&self, code: u16, class: &str, duration: Duration) {
        let labels = RetrievalLabels::new(code, class);
        self.utilization_retrieval
            .entry(labels)
            .or_default()
            .observe(duration);
    }

    fn set_utilization_service_available(&self, available: bool) {
        self.service_available
            .store(u64::from(available), Ordering::Relaxed);
    }

    fn inc_request_with_quota_metrics_unavailable(&self) {
        self.metrics_unavailable.fetch_add(1, Ordering::Relaxed);
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Quota evaluation durations by label set
    pub quota_evaluation: Vec<(EvaluationLabels, DurationStats)>,
    /// Utilization retrieval durations by label set
    pub utilization_retrieval: Vec<(RetrievalLabels, DurationStats)>,
    /// Whether the utilization service is currently available
    pub utilization_service_available: bool,
    /// Requests whose configured quota could not be checked
    pub request_with_quota_metrics_unavailable: u64,
}

impl MetricsSnapshot {
    /// Number of quota evaluations recorded with the given labels.
    pub fn evaluation_count(&self, action: &str, quota_type: &str, code: u16) -> u64 {
        let wanted = EvaluationLabels::new(action, quota_type, code);
        self.quota_evaluation
            .iter()
            .find(|(labels, _)| *labels == wanted)
            .map(|(_, stats)| stats.count)
            .unwrap_or(0)
    }

    /// Number of utilization retrievals recorded with the given labels.
    pub fn retrieval_count(&self, code: u16, class: &str) -> u64 {
        let wanted = RetrievalLabels::new(code, class);
        self.utilization_retrieval
            .iter()
            .find(|(labels, _)| *labels == wanted)
            .map(|(_, stats)| stats.count)
            .unwrap_or(0)
    }
}
