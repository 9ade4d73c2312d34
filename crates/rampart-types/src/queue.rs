//! Job queue collaborator types.
//!
//! The queue itself is an external collaborator behind the `JobQueue` port
//! in rampart-core; these are the shapes that cross that boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Point-in-time counters for one queue, compared tick-to-tick by the
/// queue health monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueSnapshot {
    /// True when any counter indicates work in flight or gone wrong.
    pub fn has_activity(&self) -> bool {
        self.waiting > 0 || self.active > 0 || self.failed > 0
    }
}

/// Backoff growth between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Retry backoff policy for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    pub kind: BackoffKind,
    pub initial_ms: u64,
}

impl Backoff {
    /// Delay before the given retry attempt (1-based).
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        match self.kind {
            BackoffKind::Fixed => self.initial_ms,
            BackoffKind::Exponential => {
                self.initial_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
            }
        }
    }
}

/// Options attached to a job on enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub attempts: u32,
    pub backoff: Backoff,
    pub priority: u32,
}

impl JobOptions {
    /// Retry policy for recovery-queue jobs: 3 attempts, exponential
    /// backoff starting at 5 seconds.
    pub fn recovery_default() -> Self {
        Self {
            attempts: 3,
            backoff: Backoff {
                kind: BackoffKind::Exponential,
                initial_ms: 5_000,
            },
            priority: 0,
        }
    }
}

/// Handle returned when a job is enqueued or retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: Uuid,
    pub job_type: String,
}

/// A job that has exhausted its attempts and sits in the failed set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedJob {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub attempts_made: u32,
    pub failed_reason: String,
}

/// Errors from queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("job {0} not found")]
    JobNotFound(Uuid),

    #[error("queue operation failed: {0}")]
    OperationFailed(String),
}
