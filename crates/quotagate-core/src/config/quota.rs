//! Quota enforcement configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Quota enforcement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Master switch for quota evaluation.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether inflight bytes are sent to the utilization service.
    ///
    /// When disabled, inflight bytes are folded into the local comparison
    /// instead of being reported remotely.
    #[serde(default = "default_true")]
    pub enable_inflights: bool,
    /// Utilization backend: `"scuba"`, `"memory"`, or `"disabled"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Age in milliseconds after which utilization data is no longer trusted.
    #[serde(default = "default_max_staleness")]
    pub max_staleness_ms: u64,
}

impl QuotaConfig {
    /// Whether quotas should be evaluated at all.
    pub fn is_quota_enabled(&self) -> bool {
        self.enabled && self.backend != "disabled"
    }

    /// Whether inflight bytes are reported to the utilization service.
    pub fn is_quota_inflight_enabled(&self) -> bool {
        self.enable_inflights
    }

    /// The staleness window as a [`Duration`].
    pub fn max_staleness(&self) -> Duration {
        Duration::from_millis(self.max_staleness_ms)
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            enable_inflights: default_true(),
            backend: default_backend(),
            max_staleness_ms: default_max_staleness(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_backend() -> String {
    "scuba".to_string()
}

fn default_max_staleness() -> u64 {
    24 * 60 * 60 * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_backend_disables_quotas() {
        let config = QuotaConfig {
            backend: "disabled".to_string(),
            ..QuotaConfig::default()
        };
        assert!(!config.is_quota_enabled());
    }

    #[test]
    fn test_master_switch() {
        let config = QuotaConfig {
            enabled: false,
            ..QuotaConfig::default()
        };
        assert!(!config.is_quota_enabled());
        assert!(QuotaConfig::default().is_quota_enabled());
    }
}
