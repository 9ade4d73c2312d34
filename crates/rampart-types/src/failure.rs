//! Failure classification and recovery result types.
//!
//! A `FailureEvent` is an immutable record of one classified failure; the
//! orchestrator keeps a bounded per-kind history of them and answers every
//! recovery attempt with a `RecoveryResult`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::queue::QueueError;

/// Closed classification of backend failures.
///
/// `Service` carries a caller-supplied service tag when message-based
/// classification is ambiguous but the context names the failing service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "service", rename_all = "snake_case")]
pub enum FailureKind {
    DbConnection,
    AiProvider,
    EmailService,
    VectorStore,
    Service(String),
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::DbConnection => write!(f, "db_connection"),
            FailureKind::AiProvider => write!(f, "ai_provider"),
            FailureKind::EmailService => write!(f, "email_service"),
            FailureKind::VectorStore => write!(f, "vector_store"),
            FailureKind::Service(tag) => write!(f, "{tag}"),
            FailureKind::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for FailureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "db_connection" => Ok(FailureKind::DbConnection),
            "ai_provider" => Ok(FailureKind::AiProvider),
            "email_service" => Ok(FailureKind::EmailService),
            "vector_store" => Ok(FailureKind::VectorStore),
            "unknown" => Ok(FailureKind::Unknown),
            other if !other.is_empty() => Ok(FailureKind::Service(other.to_string())),
            _ => Err("empty failure kind".to_string()),
        }
    }
}

/// Immutable record of one classified failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEvent {
    pub kind: FailureKind,
    pub at: DateTime<Utc>,
    /// Key/value context (service name, job id, queue name, ...).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FailureEvent {
    /// Build an event stamped with the current time.
    pub fn now(
        kind: FailureKind,
        message: impl Into<String>,
        context: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kind,
            at: Utc::now(),
            context,
            message: message.into(),
            code: None,
        }
    }
}

/// Outcome of one recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecoveryResult {
    /// The failed subsystem was brought back directly.
    Recovered,
    /// The secondary (degraded-mode) adapter is now active.
    FallbackActive { adapter: String },
    /// A healthy provider was promoted to primary.
    ProviderSwitched { provider: String },
    /// No strategy exists for this kind; nothing was done.
    Noop { reason: String },
    /// A recovery job was enqueued with its own retry policy.
    EnqueuedForRecovery { job_id: Uuid },
    /// A previously failed job was replayed successfully.
    Replayed { job_id: Uuid },
}

/// Errors from recovery operations.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// The `ai_provider` strategy found no healthy provider to promote.
    #[error("no healthy providers to promote")]
    NoHealthyProviders,

    /// A per-kind strategy failed.
    #[error("recovery strategy for '{kind}' failed: {message}")]
    StrategyFailed { kind: String, message: String },

    /// A queue operation issued during recovery failed.
    #[error("queue operation failed: {0}")]
    Queue(#[from] QueueError),

    /// The database layer could not be recovered and no fallback exists.
    #[error("database recovery failed: {0}")]
    Database(String),

    /// Every recovery path (primary strategy and default) was exhausted.
    /// Carries the original triggering error, not the strategy's own.
    #[error("recovery exhausted, original error: {message}")]
    Exhausted { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_roundtrip() {
        for kind in [
            FailureKind::DbConnection,
            FailureKind::AiProvider,
            FailureKind::EmailService,
            FailureKind::VectorStore,
            FailureKind::Unknown,
        ] {
            let s = kind.to_string();
            let parsed: FailureKind = s.parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_failure_kind_service_tag_parses() {
        let parsed: FailureKind = "scraper".parse().unwrap();
        assert_eq!(parsed, FailureKind::Service("scraper".to_string()));
    }

    #[test]
    fn test_failure_event_now_stamps_time() {
        let before = Utc::now();
        let event = FailureEvent::now(FailureKind::Unknown, "boom", BTreeMap::new());
        assert!(event.at >= before);
        assert_eq!(event.message, "boom");
        assert!(event.code.is_none());
    }

    #[test]
    fn test_recovery_result_serde_tag() {
        let result = RecoveryResult::ProviderSwitched {
            provider: "anthropic".to_string(),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"status\":\"provider_switched\""));
        assert!(json.contains("anthropic"));
    }

    #[test]
    fn test_recovery_error_exhausted_carries_original_message() {
        let err = RecoveryError::Exhausted {
            message: "MongoDB connection timeout".to_string(),
        };
        assert!(err.to_string().contains("MongoDB connection timeout"));
    }
}
