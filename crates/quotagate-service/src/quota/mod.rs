//! Quota admission control.

pub mod bytes;
pub mod decision;
pub mod evaluator;
pub mod gate;

pub use bytes::process_bytes_to_write;
pub use decision::{DegradedReason, QuotaDecision, QuotaType};
pub use evaluator::{ActionCheck, EvaluationOutcome, QuotaEvaluator, QuotaTarget};
pub use gate::QuotaGate;
