//! Top-level Rampart configuration.
//!
//! `RampartConfig` represents `rampart.toml`. Every field has a sensible
//! default so a partial (or missing) file still yields a working setup.

use serde::{Deserialize, Serialize};

use crate::chaos::ChaosLevel;
use crate::gateway::GatewayConfig;

/// Policy for escalating a persistent failure cluster.
///
/// The source applied the threshold inconsistently (sometimes history
/// length, sometimes a time window); here it is one explicit policy:
/// `cluster_size` events of the same kind within `cluster_window_secs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EscalationPolicy {
    #[serde(default = "default_cluster_size")]
    pub cluster_size: usize,
    #[serde(default = "default_cluster_window_secs")]
    pub cluster_window_secs: u64,
}

fn default_cluster_size() -> usize {
    3
}

fn default_cluster_window_secs() -> u64 {
    300
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            cluster_size: default_cluster_size(),
            cluster_window_secs: default_cluster_window_secs(),
        }
    }
}

/// Queue health monitor settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Sampling interval in seconds.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

fn default_tick_secs() -> u64 {
    30
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

/// Chaos injector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaosConfig {
    #[serde(default)]
    pub level: ChaosLevel,
    /// Consecutive triggered experiments before the kill switch engages.
    #[serde(default = "default_kill_switch_threshold")]
    pub kill_switch_threshold: u32,
    /// Kill switch cooldown in seconds; it resets itself afterwards.
    #[serde(default = "default_kill_switch_cooldown_secs")]
    pub kill_switch_cooldown_secs: u64,
    /// Endpoint prefixes that never receive injections, in any state.
    #[serde(default = "default_protected_endpoints")]
    pub protected_endpoints: Vec<String>,
}

fn default_kill_switch_threshold() -> u32 {
    5
}

fn default_kill_switch_cooldown_secs() -> u64 {
    300
}

fn default_protected_endpoints() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/auth".to_string(),
        "/metrics".to_string(),
    ]
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            level: ChaosLevel::default(),
            kill_switch_threshold: default_kill_switch_threshold(),
            kill_switch_cooldown_secs: default_kill_switch_cooldown_secs(),
            protected_endpoints: default_protected_endpoints(),
        }
    }
}

/// Top-level configuration for the resilience substrate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampartConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub escalation: EscalationPolicy,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub chaos: ChaosConfig,
    /// How long a recovery-issued queue pause lasts before the scheduled
    /// resume, in seconds.
    #[serde(default = "default_pause_resume_secs")]
    pub pause_resume_secs: u64,
}

fn default_pause_resume_secs() -> u64 {
    300
}

impl Default for RampartConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            escalation: EscalationPolicy::default(),
            monitor: MonitorConfig::default(),
            chaos: ChaosConfig::default(),
            pause_resume_secs: default_pause_resume_secs(),
        }
    }
}
