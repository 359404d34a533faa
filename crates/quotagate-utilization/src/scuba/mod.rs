//! HTTP utilization service backend.

pub mod client;

pub use client::ScubaBackend;
