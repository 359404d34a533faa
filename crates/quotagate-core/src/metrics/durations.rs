//! Labelled duration summaries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Labels of `quota_evaluation_duration_seconds`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvaluationLabels {
    /// API method of the evaluated call
    pub action: String,
    /// Quota classification (`bucket`, `account`, `bucket+account`, `delete`)
    pub quota_type: String,
    /// 200 when allowed, 429 when a quota was exceeded
    pub code: u16,
}

impl EvaluationLabels {
    /// Build a label set
    pub fn new(action: &str, quota_type: &str, code: u16) -> Self {
        Self {
            action: action.to_string(),
            quota_type: quota_type.to_string(),
            code,
        }
    }
}

/// Labels of `utilization_metrics_retrieval_duration_seconds`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RetrievalLabels {
    /// Outcome status code
    pub code: u16,
    /// Resource class (`bucket` or `account`)
    pub class: String,
}

impl RetrievalLabels {
    /// Build a label set
    pub fn new(code: u16, class: &str) -> Self {
        Self {
            code,
            class: class.to_string(),
        }
    }
}

/// Count and sum of observed durations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    /// Number of observations
    pub count: u64,
    /// Sum of observations in seconds
    pub sum_seconds: f64,
    /// Largest observation in seconds
    pub max_seconds: f64,
}

impl DurationStats {
    /// Record one observation
    pub fn observe(&mut self, duration: Duration) {
        let secs = duration.as_secs_f64();
        self.count += 1;
        self.sum_seconds += secs;
        if secs > self.max_seconds {
            self.max_seconds = secs;
        }
    }

    /// Mean observation in seconds
    pub fn mean_seconds(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_seconds / self.count as f64
        }
    }
}
