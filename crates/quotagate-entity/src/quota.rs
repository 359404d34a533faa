//! Quota value object.

use serde::{Deserialize, Serialize};

/// What a quota limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaScope {
    /// A single bucket.
    Bucket,
    /// Every bucket owned by an account.
    Account,
}

/// An administratively configured storage limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// What the limit applies to.
    pub scope: QuotaScope,
    /// Limit in bytes; `<= 0` means no quota is configured.
    pub limit_bytes: i64,
}

impl Quota {
    /// Create a quota.
    pub fn new(scope: QuotaScope, limit_bytes: i64) -> Self {
        Self { scope, limit_bytes }
    }

    /// Whether a limit is actually configured.
    pub fn is_configured(&self) -> bool {
        self.limit_bytes > 0
    }

    /// Check if `used_bytes + additional_bytes` would exceed the quota.
    pub fn would_exceed(&self, used_bytes: i64, additional_bytes: i64) -> bool {
        self.is_configured() && used_bytes.saturating_add(additional_bytes) > self.limit_bytes
    }
}
