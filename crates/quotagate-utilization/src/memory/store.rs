//! In-memory utilization backend using dashmap.
//!
//! Holds per-resource totals, answers health checks from a settable state,
//! and records every metrics call so callers can inspect what would have
//! been sent to the real service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use quotagate_core::error::AppError;
use quotagate_core::result::AppResult;
use quotagate_core::traits::utilization::UtilizationBackend;
use quotagate_core::types::metric::{
    HealthStatus, MetricsRequestBody, ResourceType, UtilizationMetric,
};

/// One metrics call received by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Resource class.
    pub resource_type: ResourceType,
    /// Resource name.
    pub resource_name: String,
    /// Request body.
    pub body: MetricsRequestBody,
}

#[derive(Debug, Clone)]
struct Failure {
    message: String,
    status_code: Option<u16>,
}

impl Failure {
    fn to_error(&self) -> AppError {
        let err = AppError::external_service(self.message.clone());
        match self.status_code {
            Some(code) => err.with_status(code),
            None => err,
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    health: Option<Failure>,
    metrics: Option<Failure>,
    resource_metrics: HashMap<ResourceType, Failure>,
    latency: Option<Duration>,
    health_status: Option<HealthStatus>,
}

/// In-memory utilization backend.
#[derive(Debug, Default)]
pub struct MemoryUtilizationBackend {
    /// Latest metric per resource.
    metrics: DashMap<(ResourceType, String), UtilizationMetric>,
    /// Every metrics call, in arrival order.
    calls: Mutex<Vec<RecordedCall>>,
    /// Injected failures and latency.
    faults: Mutex<Faults>,
    /// Whether received inflights are added to the stored totals.
    apply_inflights: bool,
    /// Number of health checks answered.
    health_checks: AtomicU64,
}

impl MemoryUtilizationBackend {
    /// Create an empty backend that reports healthy with no data date.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that adds received inflight bytes to its totals,
    /// the way the real service accounts reservations.
    pub fn with_inflight_accounting() -> Self {
        Self {
            apply_inflights: true,
            ..Self::default()
        }
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the metric of one resource.
    pub fn set_metric(&self, resource_type: ResourceType, resource_name: &str, metric: UtilizationMetric) {
        self.metrics
            .insert((resource_type, resource_name.to_string()), metric);
    }

    /// Set the byte total of one resource, stamped with the current time.
    pub fn set_bytes(&self, resource_type: ResourceType, resource_name: &str, bytes_total: i64) {
        self.set_metric(
            resource_type,
            resource_name,
            UtilizationMetric {
                bytes_total,
                objects_total: None,
                date: Some(Utc::now()),
            },
        );
    }

    /// Current byte total of one resource.
    pub fn bytes(&self, resource_type: ResourceType, resource_name: &str) -> i64 {
        self.metrics
            .get(&(resource_type, resource_name.to_string()))
            .map(|m| m.bytes_total)
            .unwrap_or(0)
    }

    /// Answer health checks with `status`.
    pub fn set_health(&self, status: HealthStatus) {
        let mut faults = self.faults();
        faults.health = None;
        faults.health_status = Some(status);
    }

    /// Make health checks fail.
    pub fn fail_health(&self, message: &str) {
        self.faults().health = Some(Failure {
            message: message.to_string(),
            status_code: None,
        });
    }

    /// Make metrics calls fail with an optional status code.
    pub fn fail_metrics(&self, message: &str, status_code: Option<u16>) {
        self.faults().metrics = Some(Failure {
            message: message.to_string(),
            status_code,
        });
    }

    /// Make metrics calls for one resource class fail.
    pub fn fail_metrics_for(&self, resource_type: ResourceType, message: &str) {
        self.faults().resource_metrics.insert(
            resource_type,
            Failure {
                message: message.to_string(),
                status_code: None,
            },
        );
    }

    /// Stop injecting metrics failures.
    pub fn clear_metrics_failure(&self) {
        let mut faults = self.faults();
        faults.metrics = None;
        faults.resource_metrics.clear();
    }

    /// Delay every metrics answer by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.faults().latency = Some(latency);
    }

    /// All metrics calls received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.recorded().clone()
    }

    /// Number of metrics calls received so far.
    pub fn call_count(&self) -> usize {
        self.recorded().len()
    }

    /// Number of health checks answered so far.
    pub fn health_check_count(&self) -> u64 {
        self.health_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UtilizationBackend for MemoryUtilizationBackend {
    fn backend_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<HealthStatus> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        let faults = self.faults();
        if let Some(failure) = &faults.health {
            return Err(failure.to_error());
        }
        Ok(faults.health_status.clone().unwrap_or_default())
    }

    async fn get_latest_metrics(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        body: &MetricsRequestBody,
    ) -> AppResult<UtilizationMetric> {
        self.recorded().push(RecordedCall {
            resource_type,
            resource_name: resource_name.to_string(),
            body: body.clone(),
        });

        let (failure, latency) = {
            let faults = self.faults();
            let failure = faults
                .metrics
                .clone()
                .or_else(|| faults.resource_metrics.get(&resource_type).cloned());
            (failure, faults.latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(failure) = failure {
            return Err(failure.to_error());
        }

        let key = (resource_type, resource_name.to_string());
        let mut entry = self.metrics.entry(key).or_default();
        if self.apply_inflights {
            if let Some(inflight) = body.inflight {
                entry.bytes_total = entry.bytes_total.saturating_add(inflight);
                debug!(
                    resource_type = %resource_type,
                    resource_name,
                    inflight,
                    bytes_total = entry.bytes_total,
                    "Applied inflight bytes"
                );
            }
        }
        Ok(entry.clone())
    }
}
