//! Account accessor.

use serde::{Deserialize, Serialize};

/// The account owning the bucket being written, as seen by the quota gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Account identifier, used as the utilization resource name.
    pub account: String,
    /// Account-wide quota in bytes; `<= 0` means none.
    #[serde(default)]
    pub quota: i64,
}

impl AccountInfo {
    /// Create an account accessor.
    pub fn new(account: impl Into<String>, quota: i64) -> Self {
        Self {
            account: account.into(),
            quota,
        }
    }
}
