//! Utilization service connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding the health-check frequency (milliseconds).
pub const HEALTHCHECK_FREQUENCY_ENV: &str = "SCUBA_HEALTHCHECK_FREQUENCY";

/// Connection settings for the external utilization service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilizationConfig {
    /// Service host name.
    #[serde(default = "default_host")]
    pub host: String,
    /// Service port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use HTTPS instead of plain HTTP.
    #[serde(default)]
    pub use_https: bool,
    /// Deadline for a single metrics call, in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Default health-check interval, in milliseconds.
    #[serde(default = "default_health_check_frequency")]
    pub health_check_frequency_ms: u64,
}

impl UtilizationConfig {
    /// Base URL of the service, without a trailing slash.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    /// Per-call deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Health-check interval, honouring [`HEALTHCHECK_FREQUENCY_ENV`].
    pub fn health_check_interval(&self) -> Duration {
        let from_env = std::env::var(HEALTHCHECK_FREQUENCY_ENV).ok();
        resolve_interval(from_env.as_deref(), self.health_check_frequency_ms)
    }
}

impl Default for UtilizationConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            use_https: false,
            request_timeout_ms: default_request_timeout(),
            health_check_frequency_ms: default_health_check_frequency(),
        }
    }
}

/// Pick the override when it parses to a positive number of milliseconds.
fn resolve_interval(override_ms: Option<&str>, default_ms: u64) -> Duration {
    let ms = override_ms
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8100
}

fn default_request_timeout() -> u64 {
    5_000
}

fn default_health_check_frequency() -> u64 {
    60_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let mut config = UtilizationConfig::default();
        assert_eq!(config.base_url(), "http://localhost:8100");
        config.use_https = true;
        config.host = "scuba.internal".to_string();
        assert_eq!(config.base_url(), "https://scuba.internal:8100");
    }

    #[test]
    fn test_interval_override() {
        assert_eq!(resolve_interval(Some("250"), 60_000), Duration::from_millis(250));
        assert_eq!(resolve_interval(Some("0"), 60_000), Duration::from_millis(60_000));
        assert_eq!(resolve_interval(Some("soon"), 60_000), Duration::from_millis(60_000));
        assert_eq!(resolve_interval(None, 1_000), Duration::from_millis(1_000));
    }
}
