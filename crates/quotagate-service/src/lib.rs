//! # quotagate-service
//!
//! Storage quota admission control. Before a request writes or deletes
//! bytes, [`QuotaGate::validate_quotas`] checks the bucket and account
//! quotas against the utilization service, reserves the inflight bytes,
//! and registers a compensation on the request that releases the
//! reservation if the API call fails.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod quota;

pub use context::RequestContext;
pub use quota::{
    ActionCheck, DegradedReason, EvaluationOutcome, QuotaDecision, QuotaEvaluator, QuotaGate,
    QuotaTarget, QuotaType, process_bytes_to_write,
};
