//! In-process utilization backend.

pub mod store;

pub use store::{MemoryUtilizationBackend, RecordedCall};
