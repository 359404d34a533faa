//! Configuration and client factory tests.

use std::sync::Arc;

use quotagate_core::config::AppConfig;
use quotagate_core::metrics::QuotaMetrics;
use quotagate_utilization::create_utilization_client;

#[test]
fn test_shipped_default_config_loads() {
    let config = AppConfig::load_from("config/default.toml").unwrap();
    assert!(config.quota.is_quota_enabled());
    assert_eq!(config.utilization.port, 8100);
    assert_eq!(config.utilization.base_url(), "http://localhost:8100");
}

#[tokio::test]
async fn test_factory_builds_memory_client() {
    let mut config = AppConfig::default();
    config.quota.backend = "memory".to_string();
    let metrics = Arc::new(QuotaMetrics::new());

    let client = create_utilization_client(&config, metrics.clone()).unwrap();
    assert!(client.check_health().await);
    assert!(metrics.snapshot().utilization_service_available);
}

#[test]
fn test_factory_rejects_unknown_backend() {
    let mut config = AppConfig::default();
    config.quota.backend = "carrier-pigeon".to_string();

    let err = create_utilization_client(&config, Arc::new(QuotaMetrics::new())).unwrap_err();
    assert_eq!(err.kind, quotagate_core::error::ErrorKind::Configuration);
}
