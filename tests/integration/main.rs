//! Cross-crate integration tests for QuotaGate.

mod config_test;
mod gate_test;
mod helpers;
