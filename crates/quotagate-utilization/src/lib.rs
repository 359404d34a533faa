//! # quotagate-utilization
//!
//! Client for the external utilization metrics service. Supports three
//! backends:
//!
//! - **scuba**: the HTTP utilization service, using [reqwest](https://crates.io/crates/reqwest)
//! - **memory**: an in-process store, for local runs and as a test double
//! - **disabled**: a stub that reports the service as unavailable
//!
//! The backend is selected at runtime based on configuration.

pub mod client;
pub mod disabled;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "scuba")]
pub mod scuba;

pub use client::UtilizationClient;
pub use disabled::DisabledUtilizationClient;
pub use provider::create_utilization_client;
