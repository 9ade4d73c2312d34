//! Provider selection and failover routing.
//!
//! Routes generation requests through multiple providers with automatic
//! failover. Providers are tried in priority order; a provider that fails is
//! degraded with a cooldown and never re-attempted within the same call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use rampart_types::gateway::{
    GatewayConfig, GatewayError, GenerationRequest, HealthState, ProviderHint, ProviderStatusInfo,
};

use super::box_provider::BoxTextProvider;
use super::health::{ProbeOutcome, ProviderRecord};

/// Shared handle to a gateway, as held by the recovery orchestrator and the
/// chaos injector. Within one process all health mutations happen under
/// this single lock.
pub type SharedGateway = Arc<Mutex<ProviderGateway>>;

/// Result of a successful generation through the gateway.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// The generated draft text.
    pub text: String,
    /// Name of the provider that handled the request.
    pub provider_name: String,
}

/// Routes generation requests across the configured providers.
///
/// Owns every `ProviderRecord` exclusively; no other component mutates
/// provider health except [`ProviderGateway::promote_provider`], which the
/// recovery orchestrator calls during `ai_provider` recovery.
pub struct ProviderGateway {
    providers: Vec<(ProviderRecord, BoxTextProvider)>,
    probe_interval: Duration,
}

impl ProviderGateway {
    /// Build a gateway from configuration and provider instances, paired by
    /// name. Providers present in the config but not supplied (or disabled)
    /// are skipped.
    pub fn new(config: &GatewayConfig, providers: Vec<BoxTextProvider>) -> Self {
        let cooldown = Duration::from_secs(config.cooldown_secs);
        let mut pairs: Vec<(ProviderRecord, BoxTextProvider)> = Vec::new();

        for provider in providers {
            let Some(cfg) = config
                .providers
                .iter()
                .find(|c| c.name == provider.name() && c.enabled)
            else {
                continue;
            };
            let record = ProviderRecord::new(&cfg.name, cfg.priority, cooldown);
            pairs.push((record, provider));
        }

        Self {
            providers: pairs,
            probe_interval: Duration::from_secs(config.probe_interval_secs),
        }
    }

    /// Wrap the gateway in the shared handle used across components.
    pub fn into_shared(self) -> SharedGateway {
        Arc::new(Mutex::new(self))
    }

    /// Indices into `self.providers` sorted by priority (ascending), ties
    /// broken by name so the order is deterministic.
    fn sorted_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.providers.len()).collect();
        indices.sort_by(|&a, &b| {
            let ra = &self.providers[a].0;
            let rb = &self.providers[b].0;
            ra.priority.cmp(&rb.priority).then_with(|| ra.name.cmp(&rb.name))
        });
        indices
    }

    /// Candidate order for one call: the hinted provider first when it is
    /// concrete and selectable, then the remaining selectable providers by
    /// priority.
    fn candidate_indices(&mut self, hint: &ProviderHint) -> Vec<usize> {
        let sorted = self.sorted_indices();
        let mut candidates = Vec::with_capacity(sorted.len());

        if let ProviderHint::Named(name) = hint {
            if let Some(idx) = self.providers.iter().position(|(r, _)| &r.name == name) {
                if self.providers[idx].0.is_selectable() {
                    candidates.push(idx);
                }
            }
        }

        for idx in sorted {
            if candidates.contains(&idx) {
                continue;
            }
            if self.providers[idx].0.is_selectable() {
                candidates.push(idx);
            }
        }
        candidates
    }

    /// Route a generation request through the fallback chain.
    ///
    /// Each candidate is attempted at most once. A provider that fails is
    /// degraded with its cooldown and the next candidate is tried. When
    /// every candidate has been tried (or none was selectable), the last
    /// error is wrapped as `NoProvidersAvailable`.
    pub async fn generate(
        &mut self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, GatewayError> {
        if request.prompt.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("empty prompt".to_string()));
        }

        let candidates = self.candidate_indices(&request.provider_hint);
        let mut last_error: Option<GatewayError> = None;

        for idx in candidates {
            let provider_name = self.providers[idx].0.name.clone();
            let result = self.providers[idx].1.generate(request).await;

            match result {
                Ok(text) => {
                    self.providers[idx].0.record_success();
                    tracing::debug!(provider = %provider_name, "Generation succeeded");
                    return Ok(GenerationOutcome {
                        text,
                        provider_name,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        provider = %provider_name,
                        error = %err,
                        "Provider failed, trying next in chain"
                    );
                    self.providers[idx].0.record_failure(&err.to_string());
                    last_error = Some(err);
                }
            }
        }

        Err(GatewayError::NoProvidersAvailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no selectable providers".to_string()),
        })
    }

    /// Probe every configured provider and apply the outcomes.
    ///
    /// A well-formed (non-empty) response marks the provider healthy, a
    /// successful-but-empty response marks it degraded, and a failed call
    /// marks it unavailable.
    pub async fn probe_all(&mut self) {
        for idx in 0..self.providers.len() {
            let response = self.providers[idx].1.probe().await;
            let outcome = match response {
                Ok(response) if !response.trim().is_empty() => ProbeOutcome::WellFormed,
                Ok(_) => ProbeOutcome::Malformed,
                Err(err) => ProbeOutcome::Failed(err.to_string()),
            };

            let record = &mut self.providers[idx].0;
            let previous = record.state;
            record.apply_probe(outcome);
            if record.state != previous {
                tracing::info!(
                    provider = %record.name,
                    from = %previous,
                    to = %record.state,
                    "Provider health changed"
                );
            }
        }
    }

    /// Name of the first provider currently in the `Healthy` state, in
    /// priority order. Used by the `ai_provider` recovery strategy.
    pub fn first_healthy(&self) -> Option<String> {
        self.sorted_indices()
            .into_iter()
            .map(|idx| &self.providers[idx].0)
            .find(|r| r.state == HealthState::Healthy)
            .map(|r| r.name.clone())
    }

    /// Promote the named provider to primary: top priority, marked healthy,
    /// cooldown cleared. Remaining providers keep their relative order.
    ///
    /// Only the recovery orchestrator calls this.
    pub fn promote_provider(&mut self, name: &str) -> Result<(), GatewayError> {
        let sorted = self.sorted_indices();
        let Some(target) = self.providers.iter().position(|(r, _)| r.name == name) else {
            return Err(GatewayError::ProviderUnavailable(name.to_string()));
        };

        // Reassign ranks with the promoted provider first.
        let mut rank = 1u32;
        for idx in sorted {
            if idx == target {
                continue;
            }
            self.providers[idx].0.priority = rank;
            rank += 1;
        }
        self.providers[target].0.priority = 0;
        self.providers[target].0.mark_healthy();

        tracing::info!(provider = %name, "Provider promoted to primary");
        Ok(())
    }

    /// Flip one provider to `Unavailable`. Used by chaos injection only.
    pub fn mark_unavailable(&mut self, name: &str) -> Result<(), GatewayError> {
        let Some((record, _)) = self.providers.iter_mut().find(|(r, _)| r.name == name) else {
            return Err(GatewayError::ProviderUnavailable(name.to_string()));
        };
        record.mark_unavailable();
        Ok(())
    }

    /// Names of all configured providers, in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.sorted_indices()
            .into_iter()
            .map(|idx| self.providers[idx].0.name.clone())
            .collect()
    }

    /// Health status of all providers (for operator display).
    pub fn health_status(&self) -> Vec<ProviderStatusInfo> {
        self.sorted_indices()
            .into_iter()
            .map(|idx| self.providers[idx].0.to_status_info())
            .collect()
    }

    /// Configured probe interval.
    pub fn probe_interval(&self) -> Duration {
        self.probe_interval
    }
}

/// Spawn the background probe loop for a shared gateway.
///
/// Probes all providers immediately, then on every interval tick until the
/// token is cancelled.
pub fn spawn_probe_loop(
    gateway: SharedGateway,
    token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let interval = gateway.lock().await.probe_interval();
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("Probe loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    gateway.lock().await.probe_all().await;
                }
            }
        }
    })
}
