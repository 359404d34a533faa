//! Utilization service traits.
//!
//! [`UtilizationBackend`] is the raw wire primitive (one implementation per
//! transport). [`UtilizationServiceClient`] is what the quota gate consumes:
//! it adds availability tracking, staleness policy, timeouts and
//! instrumentation on top of a backend.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::metric::{HealthStatus, MetricsRequestBody, ResourceType, UtilizationMetric};

/// Raw access to a utilization metrics service.
#[async_trait]
pub trait UtilizationBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Return the backend type name (e.g., "scuba", "memory").
    fn backend_type(&self) -> &str;

    /// Ask the service whether it is up and how fresh its data is.
    async fn health_check(&self) -> AppResult<HealthStatus>;

    /// Fetch the latest metrics for one resource.
    ///
    /// When `body.inflight` is set the service also records the reservation.
    async fn get_latest_metrics(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        body: &MetricsRequestBody,
    ) -> AppResult<UtilizationMetric>;
}

/// Gateway to the utilization service used by quota evaluation.
#[async_trait]
pub trait UtilizationServiceClient: Send + Sync + std::fmt::Debug + 'static {
    /// Whether the service is currently considered available.
    fn is_enabled(&self) -> bool;

    /// Age after which returned metrics are no longer trusted.
    fn max_staleness(&self) -> Duration;

    /// Fetch metrics for one resource, recording call duration and outcome.
    ///
    /// Errors are returned untouched; callers decide how to degrade.
    async fn get_utilization_metrics(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        body: &MetricsRequestBody,
    ) -> AppResult<UtilizationMetric>;

    /// Run one health check now and return the resulting availability.
    async fn check_health(&self) -> bool;

    /// Start the periodic health check, replacing any running one.
    fn start(&self) {}

    /// Stop the periodic health check.
    fn stop(&self) {}
}
