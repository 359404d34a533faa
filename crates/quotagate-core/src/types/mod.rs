//! Core type definitions used across the QuotaGate workspace.

pub mod metric;

pub use metric::{HealthStatus, MetricsRequestBody, ResourceType, UtilizationMetric};
