//! # quotagate-core
//!
//! Core crate for QuotaGate. Contains the utilization traits, configuration
//! schemas, utilization metric types, the in-process metrics registry,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other QuotaGate crates.

pub mod config;
pub mod error;
pub mod metrics;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
