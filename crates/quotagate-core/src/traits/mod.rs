//! Core traits defined in `quotagate-core` and implemented by other crates.

pub mod reporter;
pub mod utilization;

pub use reporter::MetricsReporter;
pub use utilization::{UtilizationBackend, UtilizationServiceClient};
