//! Failure classification and recovery orchestration.
//!
//! - `classifier`: maps raw error text + context into a `FailureKind`
//! - `history`: bounded per-kind failure history with cluster detection
//! - `orchestrator`: strategy dispatch, escalation, queue replay

pub mod classifier;
pub mod history;
pub mod orchestrator;

pub use classifier::classify;
pub use history::FailureHistory;
pub use orchestrator::RecoveryOrchestrator;
