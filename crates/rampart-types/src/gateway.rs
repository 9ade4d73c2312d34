//! Generation request/response types for the provider gateway.
//!
//! These types model the data shapes for routing a text-generation request
//! through the multi-provider fallback chain: the request itself, provider
//! health states, per-provider configuration, and gateway errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the caller wants a provider chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderHint {
    /// Let the gateway pick the highest-priority selectable provider.
    Auto,
    /// Prefer the named provider if it is currently selectable.
    Named(String),
}

impl Default for ProviderHint {
    fn default() -> Self {
        ProviderHint::Auto
    }
}

/// Request to generate a draft document through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The instruction prompt for the draft.
    pub prompt: String,
    /// Supporting documents (grant call text, org profile, prior proposals).
    #[serde(default)]
    pub context_docs: Vec<String>,
    /// Output language (ISO 639-1, e.g. "en", "fi").
    pub language: String,
    /// Provider routing hint.
    #[serde(default)]
    pub provider_hint: ProviderHint,
    /// Model override passed through to the selected provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_hint: Option<String>,
}

/// Health state of a single provider, as tracked by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Configured but not yet probed.
    Initializing,
    /// Probe confirmed a well-formed response; eligible for routing.
    Healthy,
    /// Recent failure or malformed probe response; in cooldown.
    Degraded,
    /// Probe call itself failed; not eligible until a probe recovers it.
    Unavailable,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Initializing => write!(f, "initializing"),
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Degraded => write!(f, "degraded"),
            HealthState::Unavailable => write!(f, "unavailable"),
        }
    }
}

impl FromStr for HealthState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initializing" => Ok(HealthState::Initializing),
            "healthy" => Ok(HealthState::Healthy),
            "degraded" => Ok(HealthState::Degraded),
            "unavailable" => Ok(HealthState::Unavailable),
            other => Err(format!("invalid health state: '{other}'")),
        }
    }
}

/// Configuration for a single provider in the gateway's preference order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Human-readable name (e.g. "openai", "anthropic", "gemini").
    pub name: String,
    /// Model identifier to use.
    pub model: String,
    /// Priority for fallback ordering; lower = higher priority.
    pub priority: u32,
    /// Whether this provider participates in routing.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Configuration for the provider gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Ordered list of provider configurations.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Cooldown applied to a provider after a failed call, in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// How often the background probe re-checks every provider, in seconds.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

fn default_cooldown_secs() -> u64 {
    30
}

fn default_probe_interval_secs() -> u64 {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            cooldown_secs: default_cooldown_secs(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

/// Status information for one provider (for operator display).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderStatusInfo {
    pub name: String,
    pub state: HealthState,
    pub priority: u32,
    pub last_error: Option<String>,
    /// Remaining cooldown in milliseconds, if a cooldown is in effect.
    pub cooldown_remaining_ms: Option<u64>,
    pub total_calls: u64,
    pub total_failures: u64,
}

/// Errors from gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A single provider call failed.
    #[error("provider '{name}' error: {message}")]
    Provider { name: String, message: String },

    /// The hinted provider exists but is not currently selectable.
    #[error("provider '{0}' is unavailable")]
    ProviderUnavailable(String),

    /// Every candidate was tried (or unselectable) and the request failed.
    #[error("no providers available: {message}")]
    NoProvidersAvailable { message: String },

    /// Recovery asked for a healthy provider and found none.
    #[error("no healthy providers in the gateway")]
    NoHealthyProviders,

    /// The request itself was rejected before routing.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_state_roundtrip() {
        for state in [
            HealthState::Initializing,
            HealthState::Healthy,
            HealthState::Degraded,
            HealthState::Unavailable,
        ] {
            let s = state.to_string();
            let parsed: HealthState = s.parse().unwrap();
            assert_eq!(state, parsed);
        }
    }

    #[test]
    fn test_health_state_serde() {
        let json = serde_json::to_string(&HealthState::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
        let parsed: HealthState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, HealthState::Degraded);
    }

    #[test]
    fn test_provider_hint_default_is_auto() {
        assert_eq!(ProviderHint::default(), ProviderHint::Auto);
    }

    #[test]
    fn test_gateway_config_defaults() {
        let config: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.cooldown_secs, 30);
        assert_eq!(config.probe_interval_secs, 60);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_provider_config_enabled_by_default() {
        let toml = r#"
name = "openai"
model = "gpt-4o"
priority = 0
"#;
        let config: ProviderConfig = toml::from_str(toml).unwrap();
        assert!(config.enabled);
    }

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::NoProvidersAvailable {
            message: "rate limit".to_string(),
        };
        assert!(err.to_string().contains("rate limit"));
    }
}
