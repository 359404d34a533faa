//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use quotagate_core::config::QuotaConfig;
use quotagate_core::metrics::QuotaMetrics;
use quotagate_core::traits::utilization::UtilizationServiceClient;
use quotagate_core::types::metric::ResourceType;
use quotagate_entity::Bucket;
use quotagate_service::QuotaGate;
use quotagate_utilization::UtilizationClient;
use quotagate_utilization::client::ClientSettings;
use quotagate_utilization::memory::MemoryUtilizationBackend;

/// Creation date shared by test buckets.
pub const CREATED: &str = "2022-01-01T00:00:00.000Z";

/// Utilization name of a test bucket called `name`.
pub fn resource_name(name: &str) -> String {
    format!("{name}_1640995200000")
}

/// Gate wired to an in-memory utilization service that accounts inflights
pub struct TestGate {
    /// The gate under test
    pub gate: QuotaGate,
    /// The utilization service double
    pub backend: Arc<MemoryUtilizationBackend>,
    /// Metrics the gate reports into
    pub metrics: Arc<QuotaMetrics>,
    /// The client wrapping `backend`
    pub client: UtilizationClient,
}

impl TestGate {
    /// Create a healthy gate with default quota settings
    pub async fn new() -> Self {
        Self::with_config(QuotaConfig::default()).await
    }

    /// Create a healthy gate with the given quota settings
    pub async fn with_config(config: QuotaConfig) -> Self {
        let backend = Arc::new(MemoryUtilizationBackend::with_inflight_accounting());
        let metrics = Arc::new(QuotaMetrics::new());
        let client = UtilizationClient::new(
            backend.clone(),
            metrics.clone(),
            ClientSettings {
                max_staleness: config.max_staleness(),
                request_timeout: Duration::from_secs(5),
                health_check_interval: Duration::from_secs(60),
            },
        );
        assert!(client.check_health().await, "memory backend should be healthy");

        let gate = QuotaGate::new(config, Arc::new(client.clone()), metrics.clone());
        Self {
            gate,
            backend,
            metrics,
            client,
        }
    }

    /// Current byte total of a test bucket
    pub fn bucket_bytes(&self, name: &str) -> i64 {
        self.backend.bytes(ResourceType::Bucket, &resource_name(name))
    }

    /// Current byte total of an account
    pub fn account_bytes(&self, account: &str) -> i64 {
        self.backend.bytes(ResourceType::Account, account)
    }
}

/// An unversioned test bucket
pub fn bucket(name: &str, quota: i64) -> Bucket {
    Bucket::new(name, CREATED, quota)
}
