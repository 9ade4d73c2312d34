//! Per-provider health tracking for the gateway's fallback chain.
//!
//! Implements a cooldown-based circuit breaker: one failed call marks the
//! provider degraded for a fixed window during which it is not selectable.
//! The periodic probe is the only path that moves a provider back to
//! healthy (besides an explicit promotion during recovery).

use std::time::{Duration, Instant};

use rampart_types::gateway::{HealthState, ProviderStatusInfo};

/// Outcome of one probe call against a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The probe returned the expected well-formed response.
    WellFormed,
    /// The call succeeded but the response shape was wrong (e.g. empty).
    Malformed,
    /// The probe call itself failed.
    Failed(String),
}

/// Health tracking for a single provider.
#[derive(Debug)]
pub struct ProviderRecord {
    /// Provider name (matches `ProviderConfig.name`).
    pub name: String,
    /// Priority in fallback ordering (lower = higher priority).
    pub priority: u32,
    /// Current health state.
    pub state: HealthState,
    /// When this provider last failed a call.
    pub last_failure_at: Option<Instant>,
    /// Until when the provider is excluded from routing.
    pub cooldown_expires_at: Option<Instant>,
    /// Cooldown applied after a failed call.
    pub cooldown: Duration,
    /// Last error message from this provider.
    pub last_error: Option<String>,
    /// Total calls routed to this provider.
    pub total_calls: u64,
    /// Total failed calls.
    pub total_failures: u64,
}

impl ProviderRecord {
    /// Create a new record in the `Initializing` state.
    pub fn new(name: impl Into<String>, priority: u32, cooldown: Duration) -> Self {
        Self {
            name: name.into(),
            priority,
            state: HealthState::Initializing,
            last_failure_at: None,
            cooldown_expires_at: None,
            cooldown,
            last_error: None,
            total_calls: 0,
            total_failures: 0,
        }
    }

    /// Whether this provider may be handed a request right now.
    ///
    /// Selectable means healthy and outside any cooldown window. An expired
    /// cooldown is cleared as a side effect.
    pub fn is_selectable(&mut self) -> bool {
        if let Some(expires) = self.cooldown_expires_at {
            if Instant::now() < expires {
                return false;
            }
            self.cooldown_expires_at = None;
        }
        self.state == HealthState::Healthy
    }

    /// Record a successful call.
    pub fn record_success(&mut self) {
        self.total_calls += 1;
        self.cooldown_expires_at = None;
    }

    /// Record a failed call: degrade the provider and start its cooldown.
    pub fn record_failure(&mut self, error: &str) {
        let now = Instant::now();
        self.total_calls += 1;
        self.total_failures += 1;
        self.last_error = Some(error.to_string());
        self.last_failure_at = Some(now);
        self.cooldown_expires_at = Some(now + self.cooldown);
        self.state = HealthState::Degraded;
    }

    /// Apply a probe outcome.
    ///
    /// This is the only path (besides recovery promotion) that can return a
    /// provider to `Healthy`.
    pub fn apply_probe(&mut self, outcome: ProbeOutcome) {
        match outcome {
            ProbeOutcome::WellFormed => {
                self.state = HealthState::Healthy;
                self.last_error = None;
            }
            ProbeOutcome::Malformed => {
                self.state = HealthState::Degraded;
            }
            ProbeOutcome::Failed(message) => {
                self.state = HealthState::Unavailable;
                self.last_error = Some(message);
            }
        }
    }

    /// Force the provider healthy. Used by the `ai_provider` recovery
    /// strategy when promoting, never by the request path.
    pub fn mark_healthy(&mut self) {
        self.state = HealthState::Healthy;
        self.cooldown_expires_at = None;
    }

    /// Force the provider unavailable. Used by chaos injection.
    pub fn mark_unavailable(&mut self) {
        self.state = HealthState::Unavailable;
    }

    /// Convert to a `ProviderStatusInfo` for operator display.
    pub fn to_status_info(&self) -> ProviderStatusInfo {
        let cooldown_remaining_ms = self.cooldown_expires_at.and_then(|expires| {
            let now = Instant::now();
            (expires > now).then(|| expires.duration_since(now).as_millis() as u64)
        });

        ProviderStatusInfo {
            name: self.name.clone(),
            state: self.state,
            priority: self.priority,
            last_error: self.last_error.clone(),
            cooldown_remaining_ms,
            total_calls: self.total_calls,
            total_failures: self.total_failures,
        }
    }
}
