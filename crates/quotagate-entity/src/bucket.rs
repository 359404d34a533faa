//! Bucket accessor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quotagate_core::error::AppError;
use quotagate_core::result::AppResult;

/// Read-only view of bucket metadata consumed by the quota gate.
pub trait BucketInfo: Send + Sync {
    /// Bucket quota in bytes; `<= 0` means none.
    fn quota(&self) -> i64;

    /// Bucket name.
    fn name(&self) -> &str;

    /// Creation date as an ISO-8601 string.
    fn creation_date(&self) -> &str;

    /// Whether object versioning is enabled.
    fn is_versioning_enabled(&self) -> bool;

    /// Name of the bucket in the utilization service.
    ///
    /// `<name>_<creationEpochMillis>`, so that a recreated bucket does not
    /// inherit the usage of its predecessor.
    fn utilization_resource_name(&self) -> AppResult<String> {
        let created = DateTime::parse_from_rfc3339(self.creation_date()).map_err(|e| {
            AppError::validation(format!(
                "Invalid creation date '{}' for bucket '{}': {e}",
                self.creation_date(),
                self.name()
            ))
        })?;
        Ok(format!(
            "{}_{}",
            self.name(),
            created.with_timezone(&Utc).timestamp_millis()
        ))
    }
}

/// Plain bucket metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// Creation date (ISO-8601).
    pub creation_date: String,
    /// Quota in bytes; `<= 0` means none.
    #[serde(default)]
    pub quota: i64,
    /// Whether versioning is enabled.
    #[serde(default)]
    pub versioning_enabled: bool,
}

impl Bucket {
    /// Create a bucket record.
    pub fn new(name: impl Into<String>, creation_date: impl Into<String>, quota: i64) -> Self {
        Self {
            name: name.into(),
            creation_date: creation_date.into(),
            quota,
            versioning_enabled: false,
        }
    }

    /// Builder-style versioning toggle.
    pub fn with_versioning(mut self, enabled: bool) -> Self {
        self.versioning_enabled = enabled;
        self
    }
}

impl BucketInfo for Bucket {
    fn quota(&self) -> i64 {
        self.quota
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn creation_date(&self) -> &str {
        &self.creation_date
    }

    fn is_versioning_enabled(&self) -> bool {
        self.versioning_enabled
    }
}
