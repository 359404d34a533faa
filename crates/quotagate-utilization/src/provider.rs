//! Factory selecting the utilization client from configuration.

use std::sync::Arc;

use tracing::info;

use quotagate_core::config::AppConfig;
use quotagate_core::error::AppError;
use quotagate_core::result::AppResult;
use quotagate_core::traits::reporter::MetricsReporter;
use quotagate_core::traits::utilization::UtilizationServiceClient;

use crate::client::{ClientSettings, UtilizationClient};
use crate::disabled::DisabledUtilizationClient;

/// Build the utilization client named by `config.quota.backend`.
///
/// The returned client is not started; call
/// [`UtilizationServiceClient::start`] once a runtime is available.
pub fn create_utilization_client(
    config: &AppConfig,
    reporter: Arc<dyn MetricsReporter>,
) -> AppResult<Arc<dyn UtilizationServiceClient>> {
    let settings = ClientSettings::from_config(config);

    let client: Arc<dyn UtilizationServiceClient> = match config.quota.backend.as_str() {
        #[cfg(feature = "scuba")]
        "scuba" => {
            info!(
                base_url = %config.utilization.base_url(),
                "Initializing utilization service client"
            );
            let backend = crate::scuba::ScubaBackend::new(&config.utilization)?;
            Arc::new(UtilizationClient::new(Arc::new(backend), reporter, settings))
        }
        #[cfg(feature = "memory")]
        "memory" => {
            info!("Initializing in-memory utilization backend");
            let backend = crate::memory::MemoryUtilizationBackend::with_inflight_accounting();
            Arc::new(UtilizationClient::new(Arc::new(backend), reporter, settings))
        }
        "disabled" => {
            info!("Utilization backend disabled, quotas will not be enforced");
            Arc::new(DisabledUtilizationClient::new(settings.max_staleness))
        }
        other => {
            return Err(AppError::configuration(format!(
                "Unknown utilization backend: '{other}'. Supported: scuba, memory, disabled"
            )));
        }
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotagate_core::metrics::QuotaMetrics;

    fn config_with(backend: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.quota.backend = backend.to_string();
        config
    }

    #[tokio::test]
    async fn test_memory_backend_becomes_enabled() {
        let client =
            create_utilization_client(&config_with("memory"), Arc::new(QuotaMetrics::new())).unwrap();
        assert!(!client.is_enabled());
        assert!(client.check_health().await);
        assert!(client.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_backend_stays_disabled() {
        let client =
            create_utilization_client(&config_with("disabled"), Arc::new(QuotaMetrics::new()))
                .unwrap();
        assert!(!client.check_health().await);
        assert!(!client.is_enabled());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = create_utilization_client(&config_with("carrier-pigeon"), Arc::new(QuotaMetrics::new()))
            .unwrap_err();
        assert_eq!(err.kind, quotagate_core::error::ErrorKind::Configuration);
    }
}
