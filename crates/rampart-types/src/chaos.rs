//! Chaos experiment types.
//!
//! The chaos injector exercises the recovery paths by injecting failures at
//! a configured probability. Each triggered injection is recorded as a
//! `ChaosExperiment` for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Supported failure injections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosKind {
    /// Awaited delay injected into the request path.
    Latency,
    /// Queue pause/resume bounce simulating a dropped broker connection.
    ConnectionReset,
    /// Flip one provider's health to unavailable.
    ProviderFailure,
    /// Force the database layer onto its secondary adapter.
    DbDisconnect,
    /// Bounded memory growth, freed when the experiment ends.
    MemoryLeak,
}

impl ChaosKind {
    pub const ALL: [ChaosKind; 5] = [
        ChaosKind::Latency,
        ChaosKind::ConnectionReset,
        ChaosKind::ProviderFailure,
        ChaosKind::DbDisconnect,
        ChaosKind::MemoryLeak,
    ];
}

impl fmt::Display for ChaosKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChaosKind::Latency => write!(f, "latency"),
            ChaosKind::ConnectionReset => write!(f, "connection_reset"),
            ChaosKind::ProviderFailure => write!(f, "provider_failure"),
            ChaosKind::DbDisconnect => write!(f, "db_disconnect"),
            ChaosKind::MemoryLeak => write!(f, "memory_leak"),
        }
    }
}

/// Discrete chaos intensity, mapped to a per-tick failure probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosLevel {
    Safe,
    Moderate,
    Aggressive,
    Apocalypse,
}

impl ChaosLevel {
    /// Probability that a sampling tick injects a failure.
    pub fn failure_probability(&self) -> f64 {
        match self {
            ChaosLevel::Safe => 0.01,
            ChaosLevel::Moderate => 0.05,
            ChaosLevel::Aggressive => 0.15,
            ChaosLevel::Apocalypse => 0.40,
        }
    }
}

impl Default for ChaosLevel {
    fn default() -> Self {
        ChaosLevel::Safe
    }
}

/// Lifecycle status of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    Running,
    Stopped,
}

/// Audit record of one injected (or explicitly triggered) failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaosExperiment {
    pub id: Uuid,
    pub kind: ChaosKind,
    pub level: ChaosLevel,
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
    pub status: ExperimentStatus,
    /// Target service or endpoint, when the admin surface named one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Operator-facing snapshot of the chaos kill switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillSwitchState {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    /// Consecutive experiments since the last quiet tick.
    pub consecutive: u32,
}

/// Errors from the chaos control surface.
#[derive(Debug, thiserror::Error)]
pub enum ChaosError {
    /// The kill switch is active and the target is not protected.
    #[error("injection suppressed by kill switch")]
    Suppressed,

    /// The target is on the protected list and is never injected.
    #[error("target '{0}' is protected from injection")]
    ProtectedTarget(String),

    #[error("unknown experiment {0}")]
    UnknownExperiment(Uuid),
}
