//! Utilization metric types exchanged with the utilization service.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Class of resource a utilization metric describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// A bucket, named `<bucket>_<creationEpochMillis>`.
    Bucket,
    /// An account, named by its identifier.
    Account,
}

impl ResourceType {
    /// Wire/label representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bucket => "bucket",
            Self::Account => "account",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest utilization figures for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationMetric {
    /// Bytes currently accounted to the resource.
    #[serde(default)]
    pub bytes_total: i64,
    /// Objects currently accounted to the resource, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects_total: Option<i64>,
    /// When the figures were computed, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl UtilizationMetric {
    /// Create a metric with only a byte total.
    pub fn with_bytes(bytes_total: i64) -> Self {
        Self {
            bytes_total,
            ..Self::default()
        }
    }

    /// Whether the metric carries a timestamp older than `max_staleness`.
    ///
    /// Metrics without a timestamp are never stale.
    pub fn is_stale(&self, max_staleness: Duration, now: DateTime<Utc>) -> bool {
        is_older_than(self.date, max_staleness, now)
    }
}

/// Body of a metrics request: the action being authorized and, when
/// inflight reporting is enabled, the signed bytes to reserve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsRequestBody {
    /// Authorization action name.
    pub action: String,
    /// Signed inflight byte delta; omitted when inflights are not reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflight: Option<i64>,
}

impl MetricsRequestBody {
    /// Create a body for `action`.
    pub fn new(action: impl Into<String>, inflight: Option<i64>) -> Self {
        Self {
            action: action.into(),
            inflight,
        }
    }

    /// The same request with the inflight sign flipped, used to release a reservation.
    pub fn reversed(&self) -> Self {
        Self {
            action: self.action.clone(),
            inflight: self.inflight.map(i64::saturating_neg),
        }
    }
}

/// Result of a utilization service health check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Date of the most recent data the service holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl HealthStatus {
    /// Whether the reported data is older than `max_staleness`.
    pub fn is_stale(&self, max_staleness: Duration, now: DateTime<Utc>) -> bool {
        is_older_than(self.date, max_staleness, now)
    }
}

fn is_older_than(date: Option<DateTime<Utc>>, max_age: Duration, now: DateTime<Utc>) -> bool {
    let Some(date) = date else {
        return false;
    };
    match (now - date).to_std() {
        Ok(age) => age > max_age,
        // Timestamps in the future are fresh.
        Err(_) => false,
    }
}
