//! Admission decision types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a quota admission check that did not deny the request.
///
/// A denial is not a variant: it is returned as an
/// [`ErrorKind::QuotaExceeded`](quotagate_core::error::ErrorKind::QuotaExceeded) error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum QuotaDecision {
    /// Quotas were checked and are not exceeded, or none apply.
    Allowed,
    /// The request is allowed because quotas could not be enforced.
    AllowedDegraded(DegradedReason),
}

impl QuotaDecision {
    /// Whether quota enforcement was skipped or partial.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::AllowedDegraded(_))
    }
}

/// Why a configured quota could not be enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DegradedReason {
    /// The utilization service is disabled or failed its health check.
    ServiceDisabled,
    /// The utilization service returned data older than the staleness window.
    StaleMetrics,
    /// Fetching utilization metrics failed.
    MetricsUnavailable {
        /// Description of the failure.
        error: String,
    },
}

/// Quota classification of an API call, used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotaType {
    /// Both a bucket and an account quota apply.
    #[serde(rename = "bucket+account")]
    BucketAndAccount,
    /// Only a bucket quota applies.
    #[serde(rename = "bucket")]
    Bucket,
    /// Only an account quota applies.
    #[serde(rename = "account")]
    Account,
    /// The call deletes data.
    #[serde(rename = "delete")]
    Delete,
}

impl QuotaType {
    /// Classify a call from its configured quotas.
    pub fn classify(bucket_quota: i64, account_quota: i64, is_deletion: bool) -> Self {
        if is_deletion {
            Self::Delete
        } else if bucket_quota > 0 && account_quota > 0 {
            Self::BucketAndAccount
        } else if bucket_quota > 0 {
            Self::Bucket
        } else {
            Self::Account
        }
    }

    /// Label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BucketAndAccount => "bucket+account",
            Self::Bucket => "bucket",
            Self::Account => "account",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for QuotaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
