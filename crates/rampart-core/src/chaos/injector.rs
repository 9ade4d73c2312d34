//! Probabilistic failure injection.
//!
//! Each sampling tick draws a Bernoulli trial at the configured level's
//! probability; a hit picks one of the five failure kinds at random and
//! injects it against the live gateway, database layer, or queue. Every
//! injection is recorded as an audit `ChaosExperiment`, the kill switch
//! counts it, and protected endpoints are never targeted in any state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use rampart_types::chaos::{
    ChaosError, ChaosExperiment, ChaosKind, ChaosLevel, ExperimentStatus, KillSwitchState,
};
use rampart_types::config::ChaosConfig;

use crate::db::DatabaseLayer;
use crate::gateway::SharedGateway;
use crate::queue::JobQueue;

use super::kill_switch::KillSwitch;

/// Upper bound on the memory-leak injection, in bytes. The allocation is
/// held for the experiment duration and then freed.
const LEAK_BYTES: usize = 8 * 1024 * 1024;

/// Bernoulli trial at the level's failure probability.
///
/// Factored out so tests can drive it with a seeded generator.
pub(crate) fn draw_injection<R: Rng>(rng: &mut R, level: ChaosLevel) -> bool {
    rng.gen_bool(level.failure_probability())
}

pub struct ChaosInjector<Q: JobQueue + 'static> {
    gateway: SharedGateway,
    database: Arc<DatabaseLayer>,
    queue: Arc<Q>,
    level: StdMutex<ChaosLevel>,
    protected: Vec<String>,
    kill_switch: StdMutex<KillSwitch>,
    experiments: Arc<DashMap<Uuid, ChaosExperiment>>,
    /// Cancellation handles for experiments with a running background task;
    /// `stop_experiment` cancels these so their effects end immediately.
    cancel_tokens: Arc<DashMap<Uuid, CancellationToken>>,
    /// Bytes currently held by live memory-leak experiments.
    leaked_bytes: Arc<AtomicU64>,
}

impl<Q: JobQueue + 'static> ChaosInjector<Q> {
    pub fn new(
        config: &ChaosConfig,
        gateway: SharedGateway,
        database: Arc<DatabaseLayer>,
        queue: Arc<Q>,
    ) -> Self {
        Self {
            gateway,
            database,
            queue,
            level: StdMutex::new(config.level),
            protected: config.protected_endpoints.clone(),
            kill_switch: StdMutex::new(KillSwitch::new(
                config.kill_switch_threshold,
                Duration::from_secs(config.kill_switch_cooldown_secs),
            )),
            experiments: Arc::new(DashMap::new()),
            cancel_tokens: Arc::new(DashMap::new()),
            leaked_bytes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn level(&self) -> ChaosLevel {
        *self.level.lock().expect("chaos level poisoned")
    }

    pub fn set_level(&self, level: ChaosLevel) {
        tracing::info!(level = ?level, "Chaos level changed");
        *self.level.lock().expect("chaos level poisoned") = level;
    }

    /// One sampling tick: draw, and on a hit inject a random kind.
    ///
    /// A quiet draw resets the kill switch's consecutive counter. A hit
    /// while the switch is engaged is suppressed and reported as such.
    pub async fn sample(&self, duration: Duration) -> Result<Option<ChaosExperiment>, ChaosError> {
        let level = self.level();
        let (triggered, kind) = {
            let mut rng = rand::thread_rng();
            let kind = *ChaosKind::ALL
                .choose(&mut rng)
                .unwrap_or(&ChaosKind::Latency);
            (draw_injection(&mut rng, level), kind)
        };

        if !triggered {
            self.kill_switch
                .lock()
                .expect("kill switch poisoned")
                .record_quiet_tick();
            return Ok(None);
        }

        self.inject(kind, None, duration).await.map(Some)
    }

    /// Inject one failure kind, recording the experiment for audit.
    ///
    /// `target` names an endpoint or provider when the caller has one.
    /// Protected targets are rejected outright; an engaged kill switch
    /// suppresses everything else.
    pub async fn inject(
        &self,
        kind: ChaosKind,
        target: Option<&str>,
        duration: Duration,
    ) -> Result<ChaosExperiment, ChaosError> {
        if let Some(target) = target {
            if self.is_protected(target) {
                return Err(ChaosError::ProtectedTarget(target.to_string()));
            }
        }
        {
            let mut switch = self.kill_switch.lock().expect("kill switch poisoned");
            if !switch.permits() {
                return Err(ChaosError::Suppressed);
            }
            switch.record_experiment();
        }

        let experiment = ChaosExperiment {
            id: Uuid::now_v7(),
            kind,
            level: self.level(),
            duration,
            started_at: Utc::now(),
            status: ExperimentStatus::Running,
            target: target.map(str::to_string),
        };
        tracing::warn!(
            experiment_id = %experiment.id,
            kind = %kind,
            duration_ms = duration.as_millis() as u64,
            "Injecting chaos"
        );
        self.experiments.insert(experiment.id, experiment.clone());

        match kind {
            ChaosKind::Latency => self.inject_latency(experiment.id, duration),
            ChaosKind::ConnectionReset => self.inject_connection_reset().await,
            ChaosKind::ProviderFailure => self.inject_provider_failure(target).await,
            ChaosKind::DbDisconnect => self.inject_db_disconnect().await,
            ChaosKind::MemoryLeak => self.inject_memory_leak(experiment.id, duration),
        }

        Ok(experiment)
    }

    /// Register a cancellation handle for an experiment's background task.
    fn register_cancel(&self, experiment_id: Uuid) -> CancellationToken {
        let token = CancellationToken::new();
        self.cancel_tokens.insert(experiment_id, token.clone());
        token
    }

    fn is_protected(&self, target: &str) -> bool {
        self.protected
            .iter()
            .any(|prefix| target.starts_with(prefix.as_str()))
    }

    /// Delay window held by a background task, so a latency draw from the
    /// sampling loop never stalls the sampler's cadence. Ends early when
    /// the experiment is stopped.
    fn inject_latency(&self, experiment_id: Uuid, duration: Duration) {
        let experiments = Arc::clone(&self.experiments);
        let tokens = Arc::clone(&self.cancel_tokens);
        let token = self.register_cancel(experiment_id);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {}
            }
            if let Some(mut entry) = experiments.get_mut(&experiment_id) {
                entry.status = ExperimentStatus::Stopped;
            }
            tokens.remove(&experiment_id);
        });
    }

    /// Pause/resume bounce simulating a dropped broker connection.
    async fn inject_connection_reset(&self) {
        if let Err(err) = self.queue.pause().await {
            tracing::error!(queue = %self.queue.name(), error = %err, "Chaos pause failed");
            return;
        }
        if let Err(err) = self.queue.resume().await {
            tracing::error!(queue = %self.queue.name(), error = %err, "Chaos resume failed");
        }
    }

    /// Flip one provider to unavailable; the probe loop will rehabilitate it.
    async fn inject_provider_failure(&self, target: Option<&str>) {
        let mut gateway = self.gateway.lock().await;
        let name = match target {
            Some(name) => name.to_string(),
            None => match gateway.provider_names().first() {
                Some(name) => name.clone(),
                None => {
                    tracing::warn!("No providers registered, skipping provider injection");
                    return;
                }
            },
        };
        if let Err(err) = gateway.mark_unavailable(&name) {
            tracing::error!(provider = %name, error = %err, "Provider injection failed");
        }
    }

    /// Force the database layer onto its secondary adapter, if one exists.
    async fn inject_db_disconnect(&self) {
        match self.database.switch_to_secondary() {
            Ok(adapter) => {
                tracing::warn!(adapter = %adapter, "Chaos forced database onto secondary")
            }
            Err(err) => tracing::warn!(error = %err, "DB disconnect injection skipped"),
        }
    }

    /// Bounded allocation held until the experiment's duration elapses or
    /// it is stopped, whichever comes first, then freed and the experiment
    /// marked stopped. Never grows past [`LEAK_BYTES`].
    fn inject_memory_leak(&self, experiment_id: Uuid, duration: Duration) {
        let leaked = Arc::clone(&self.leaked_bytes);
        let experiments = Arc::clone(&self.experiments);
        let tokens = Arc::clone(&self.cancel_tokens);
        let token = self.register_cancel(experiment_id);
        tokio::spawn(async move {
            let ballast = vec![0u8; LEAK_BYTES];
            leaked.fetch_add(ballast.len() as u64, Ordering::Relaxed);
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {}
            }
            leaked.fetch_sub(ballast.len() as u64, Ordering::Relaxed);
            drop(ballast);
            if let Some(mut entry) = experiments.get_mut(&experiment_id) {
                entry.status = ExperimentStatus::Stopped;
            }
            tokens.remove(&experiment_id);
        });
    }

    /// Stop an experiment: mark it stopped and cancel its background task,
    /// so timed effects (held ballast, latency window) end immediately.
    /// The audit record stays.
    pub fn stop_experiment(&self, id: Uuid) -> Result<ChaosExperiment, ChaosError> {
        let experiment = {
            let mut entry = self
                .experiments
                .get_mut(&id)
                .ok_or(ChaosError::UnknownExperiment(id))?;
            entry.status = ExperimentStatus::Stopped;
            entry.clone()
        };
        if let Some((_, token)) = self.cancel_tokens.remove(&id) {
            token.cancel();
        }
        Ok(experiment)
    }

    pub fn experiments(&self) -> Vec<ChaosExperiment> {
        let mut all: Vec<_> = self.experiments.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|e| e.started_at);
        all
    }

    pub fn kill_switch_state(&self) -> KillSwitchState {
        self.kill_switch
            .lock()
            .expect("kill switch poisoned")
            .state()
    }

    pub fn leaked_bytes(&self) -> u64 {
        self.leaked_bytes.load(Ordering::Relaxed)
    }

    /// Background sampling loop, one draw per tick until cancelled.
    pub async fn run(
        self: Arc<Self>,
        tick: Duration,
        duration: Duration,
        token: tokio_util::sync::CancellationToken,
    ) {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Chaos injector stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.sample(duration).await {
                        Ok(Some(experiment)) => {
                            tracing::info!(experiment_id = %experiment.id, "Chaos experiment recorded");
                        }
                        Ok(None) => {}
                        Err(ChaosError::Suppressed) => {
                            tracing::info!("Chaos draw suppressed by kill switch");
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "Chaos sampling failed");
                        }
                    }
                }
            }
        }
    }
}
