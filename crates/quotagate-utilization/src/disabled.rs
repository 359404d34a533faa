//! Stub client used when no utilization backend is configured.

use std::time::Duration;

use async_trait::async_trait;

use quotagate_core::error::AppError;
use quotagate_core::result::AppResult;
use quotagate_core::traits::utilization::UtilizationServiceClient;
use quotagate_core::types::metric::{MetricsRequestBody, ResourceType, UtilizationMetric};

/// A client that is never enabled.
#[derive(Debug, Clone)]
pub struct DisabledUtilizationClient {
    max_staleness: Duration,
}

impl DisabledUtilizationClient {
    /// Create the stub.
    pub fn new(max_staleness: Duration) -> Self {
        Self { max_staleness }
    }
}

#[async_trait]
impl UtilizationServiceClient for DisabledUtilizationClient {
    fn is_enabled(&self) -> bool {
        false
    }

    fn max_staleness(&self) -> Duration {
        self.max_staleness
    }

    async fn get_utilization_metrics(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        _body: &MetricsRequestBody,
    ) -> AppResult<UtilizationMetric> {
        Err(AppError::service_unavailable(format!(
            "No utilization backend configured for {resource_type} '{resource_name}'"
        )))
    }

    async fn check_health(&self) -> bool {
        false
    }
}
