//! Recovery orchestration.
//!
//! Owns the failure history, dispatches per-kind recovery strategies,
//! escalates persistent clusters through the alert sink, and replays
//! failed queue jobs with a pause/resume protective action.
//!
//! Strategy dispatch is an exhaustive match over `FailureKind`; kinds
//! without a dedicated strategy fall through to the default recovery
//! (enqueue on the recovery queue with its own retry policy).

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use rampart_types::config::EscalationPolicy;
use rampart_types::failure::{FailureEvent, FailureKind, RecoveryError, RecoveryResult};
use rampart_types::queue::{FailedJob, JobOptions};

use crate::alert::{AlertSink, BoxAlertSink, TracingAlertSink};
use crate::db::DatabaseLayer;
use crate::gateway::SharedGateway;
use crate::queue::JobQueue;

use super::classifier::classify;
use super::history::FailureHistory;

/// Job type used for enqueued recovery work.
pub const RECOVERY_JOB_TYPE: &str = "failure-recovery";

/// Central recovery coordinator.
///
/// `Q` is the recovery queue where unhandled failures are parked with a
/// retry policy. All state (history, pending resumes) is process-local;
/// multi-process deployments need a shared store behind these same ports.
pub struct RecoveryOrchestrator<Q: JobQueue> {
    gateway: SharedGateway,
    database: Arc<DatabaseLayer>,
    recovery_queue: Arc<Q>,
    alerts: BoxAlertSink,
    history: StdMutex<FailureHistory>,
    policy: EscalationPolicy,
    pause_resume: Duration,
    /// Queues with a resume already scheduled; guards the "exactly one
    /// scheduled resume per pause" invariant.
    resume_pending: Arc<StdMutex<HashSet<String>>>,
}

impl<Q: JobQueue> RecoveryOrchestrator<Q> {
    pub fn new(
        gateway: SharedGateway,
        database: Arc<DatabaseLayer>,
        recovery_queue: Arc<Q>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            gateway,
            database,
            recovery_queue,
            alerts: BoxAlertSink::new(TracingAlertSink),
            history: StdMutex::new(FailureHistory::new()),
            policy,
            pause_resume: Duration::from_secs(300),
            resume_pending: Arc::new(StdMutex::new(HashSet::new())),
        }
    }

    /// Replace the default (log-only) alert sink.
    pub fn with_alert_sink<S: AlertSink + 'static>(mut self, sink: S) -> Self {
        self.alerts = BoxAlertSink::new(sink);
        self
    }

    /// Override how long a protective queue pause lasts.
    pub fn with_pause_resume(mut self, pause_resume: Duration) -> Self {
        self.pause_resume = pause_resume;
        self
    }

    /// Classify a failure, record it, maybe escalate, and run recovery.
    ///
    /// The per-kind strategy runs first; if it fails the default recovery
    /// gets a second chance; if that fails too the *original* triggering
    /// error is returned, not the strategy's secondary error.
    pub async fn trigger_recovery(
        &self,
        message: &str,
        context: BTreeMap<String, String>,
    ) -> Result<RecoveryResult, RecoveryError> {
        let kind = classify(message, &context);
        let event = FailureEvent::now(kind.clone(), message, context);

        let escalate = {
            let mut history = self.history.lock().expect("failure history poisoned");
            history.record(event.clone());
            history.should_escalate(&kind, &self.policy)
        };
        if escalate {
            self.escalate(&kind).await;
        }

        tracing::warn!(kind = %kind, error = %message, "Recovery triggered");

        match self.run_strategy(&kind, &event).await {
            Ok(result) => Ok(result),
            Err(strategy_err) => {
                tracing::warn!(
                    kind = %kind,
                    error = %strategy_err,
                    "Strategy failed, attempting default recovery"
                );
                match self.default_recovery(&event).await {
                    Ok(result) => Ok(result),
                    Err(default_err) => {
                        tracing::error!(
                            kind = %kind,
                            strategy_error = %strategy_err,
                            default_error = %default_err,
                            "All recovery paths exhausted"
                        );
                        Err(RecoveryError::Exhausted {
                            message: message.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Exhaustive per-kind strategy dispatch.
    async fn run_strategy(
        &self,
        kind: &FailureKind,
        event: &FailureEvent,
    ) -> Result<RecoveryResult, RecoveryError> {
        match kind {
            FailureKind::DbConnection => self.recover_database().await,
            FailureKind::AiProvider => self.switch_provider().await,
            // Documented gaps: no retry path exists for these services yet.
            FailureKind::EmailService => Ok(RecoveryResult::Noop {
                reason: "email service recovery not implemented".to_string(),
            }),
            FailureKind::VectorStore => Ok(RecoveryResult::Noop {
                reason: "vector store recovery not implemented".to_string(),
            }),
            FailureKind::Service(_) | FailureKind::Unknown => self.default_recovery(event).await,
        }
    }

    /// `db_connection`: reinitialize the connection layer and ping; on
    /// failure switch permanently to the secondary adapter, if one exists.
    async fn recover_database(&self) -> Result<RecoveryResult, RecoveryError> {
        match self.database.reinitialize().await {
            Ok(()) => {
                tracing::info!("Database connection reinitialized");
                Ok(RecoveryResult::Recovered)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Database reinitialization failed");
                if self.database.has_secondary() {
                    let adapter = self
                        .database
                        .switch_to_secondary()
                        .map_err(|e| RecoveryError::Database(e.to_string()))?;
                    Ok(RecoveryResult::FallbackActive { adapter })
                } else {
                    Err(RecoveryError::Database(err.to_string()))
                }
            }
        }
    }

    /// `ai_provider`: promote the first healthy provider to primary.
    async fn switch_provider(&self) -> Result<RecoveryResult, RecoveryError> {
        let mut gateway = self.gateway.lock().await;
        let Some(name) = gateway.first_healthy() else {
            return Err(RecoveryError::NoHealthyProviders);
        };
        gateway
            .promote_provider(&name)
            .map_err(|e| RecoveryError::StrategyFailed {
                kind: FailureKind::AiProvider.to_string(),
                message: e.to_string(),
            })?;
        Ok(RecoveryResult::ProviderSwitched { provider: name })
    }

    /// Default recovery: park the failure on the recovery queue with its
    /// own retry policy (3 attempts, exponential backoff from 5 s).
    async fn default_recovery(&self, event: &FailureEvent) -> Result<RecoveryResult, RecoveryError> {
        let payload = serde_json::to_value(event).map_err(|e| RecoveryError::StrategyFailed {
            kind: event.kind.to_string(),
            message: e.to_string(),
        })?;
        let handle = self
            .recovery_queue
            .add(RECOVERY_JOB_TYPE, payload, JobOptions::recovery_default())
            .await?;
        tracing::info!(job_id = %handle.id, kind = %event.kind, "Failure enqueued for recovery");
        Ok(RecoveryResult::EnqueuedForRecovery { job_id: handle.id })
    }

    /// Post a persistent-cluster alert. Never propagates: sink errors are
    /// logged and swallowed so escalation cannot break the recovery path.
    async fn escalate(&self, kind: &FailureKind) {
        let (count, last_message) = {
            let history = self.history.lock().expect("failure history poisoned");
            let count = history.len_for(kind);
            let last = history
                .events_for(kind)
                .last()
                .map(|e| e.message.clone())
                .unwrap_or_default();
            (count, last)
        };

        let text = format!(
            "Persistent '{kind}' failures: {count} on record, {size}+ within the last {window}s. Last error: {last_message}",
            size = self.policy.cluster_size,
            window = self.policy.cluster_window_secs,
        );
        tracing::error!(kind = %kind, count, "Failure cluster escalated");

        if let Err(err) = self.alerts.post_alert(&text).await {
            tracing::error!(error = %err, "Failed to post escalation alert");
        }
    }

    /// Replay every currently failed job of the named queue, best effort.
    ///
    /// Fetch errors and per-job replay failures are logged, not raised; the
    /// protective pause inside `process_recovery_job` still applies.
    pub async fn trigger_recovery_for_queue<T: JobQueue + 'static>(
        &self,
        queue: &Arc<T>,
    ) -> Result<Vec<RecoveryResult>, RecoveryError> {
        let failed = match queue.failed_jobs().await {
            Ok(failed) => failed,
            Err(err) => {
                tracing::warn!(queue = %queue.name(), error = %err, "Could not fetch failed jobs");
                return Ok(Vec::new());
            }
        };
        if failed.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(queue = %queue.name(), count = failed.len(), "Replaying failed jobs");
        let mut results = Vec::with_capacity(failed.len());
        for job in failed {
            match self.process_recovery_job(queue, &job).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    tracing::error!(job_id = %job.id, error = %err, "Job replay failed");
                }
            }
        }
        Ok(results)
    }

    /// Replay one failed job; on failure pause the originating queue as a
    /// protective action and schedule exactly one resume, then re-raise.
    pub async fn process_recovery_job<T: JobQueue + 'static>(
        &self,
        queue: &Arc<T>,
        job: &FailedJob,
    ) -> Result<RecoveryResult, RecoveryError> {
        match queue.retry_job(job.id).await {
            Ok(handle) => {
                tracing::info!(job_id = %handle.id, queue = %queue.name(), "Job replayed");
                Ok(RecoveryResult::Replayed { job_id: handle.id })
            }
            Err(err) => {
                self.pause_with_scheduled_resume(queue).await;
                Err(RecoveryError::Queue(err))
            }
        }
    }

    /// Pause `queue` and schedule its resume after `pause_resume`.
    ///
    /// A queue with a resume already pending is left alone, so repeated
    /// replay failures during one pause window cannot stack pauses or
    /// schedule extra resumes.
    async fn pause_with_scheduled_resume<T: JobQueue + 'static>(&self, queue: &Arc<T>) {
        {
            let mut pending = self.resume_pending.lock().expect("resume set poisoned");
            if !pending.insert(queue.name().to_string()) {
                return;
            }
        }

        if let Err(err) = queue.pause().await {
            tracing::error!(queue = %queue.name(), error = %err, "Protective pause failed");
            self.resume_pending
                .lock()
                .expect("resume set poisoned")
                .remove(queue.name());
            return;
        }
        tracing::warn!(
            queue = %queue.name(),
            resume_in_ms = self.pause_resume.as_millis() as u64,
            "Queue paused as protective action"
        );

        let delay = self.pause_resume;
        let queue = Arc::clone(queue);
        let pending = Arc::clone(&self.resume_pending);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match queue.resume().await {
                Ok(()) => tracing::info!(queue = %queue.name(), "Queue resumed after protective pause"),
                Err(err) => tracing::error!(queue = %queue.name(), error = %err, "Scheduled resume failed"),
            }
            pending
                .lock()
                .expect("resume set poisoned")
                .remove(queue.name());
        });
    }

    /// Snapshot of the stored history length for a kind (operator surface).
    pub fn history_len(&self, kind: &FailureKind) -> usize {
        self.history
            .lock()
            .expect("failure history poisoned")
            .len_for(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::test_alert::RecordingSink;
    use crate::db::test_db::TestAdapter;
    use crate::gateway::{BoxTextProvider, ProviderGateway, TextProvider};
    use crate::queue::test_queue::TestQueue;
    use rampart_types::gateway::{GatewayConfig, GatewayError, GenerationRequest, ProviderConfig};
    use std::sync::atomic::Ordering;

    struct StaticProvider {
        name: String,
    }

    impl TextProvider for StaticProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> impl std::future::Future<Output = Result<String, GatewayError>> + Send {
            let text = format!("draft from {}", self.name);
            async move { Ok(text) }
        }
    }

    async fn healthy_gateway(names: &[&str]) -> crate::gateway::SharedGateway {
        let config = GatewayConfig {
            providers: names
                .iter()
                .enumerate()
                .map(|(i, name)| ProviderConfig {
                    name: name.to_string(),
                    model: format!("{name}-model"),
                    priority: i as u32,
                    enabled: true,
                })
                .collect(),
            cooldown_secs: 30,
            probe_interval_secs: 60,
        };
        let providers = names
            .iter()
            .map(|name| {
                BoxTextProvider::new(StaticProvider {
                    name: name.to_string(),
                })
            })
            .collect();
        let mut gateway = ProviderGateway::new(&config, providers);
        gateway.probe_all().await;
        gateway.into_shared()
    }

    fn policy() -> EscalationPolicy {
        EscalationPolicy {
            cluster_size: 3,
            cluster_window_secs: 300,
        }
    }

    async fn orchestrator(
        database: DatabaseLayer,
    ) -> (RecoveryOrchestrator<TestQueue>, Arc<TestQueue>) {
        let gateway = healthy_gateway(&["openai", "anthropic"]).await;
        let queue = Arc::new(TestQueue::named("recovery"));
        let orchestrator = RecoveryOrchestrator::new(
            gateway,
            Arc::new(database),
            Arc::clone(&queue),
            policy(),
        );
        (orchestrator, queue)
    }

    #[tokio::test]
    async fn test_db_recovery_succeeds_when_primary_healthy() {
        let (orchestrator, _) = orchestrator(DatabaseLayer::new(TestAdapter::named("mongo"))).await;
        let result = orchestrator
            .trigger_recovery("MongoDB connection timeout", BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(result, RecoveryResult::Recovered);
    }

    #[tokio::test]
    async fn test_db_recovery_switches_to_secondary() {
        let database = DatabaseLayer::new(TestAdapter::failing("mongo"))
            .with_secondary(TestAdapter::named("sqlite-degraded"));
        let (orchestrator, _) = orchestrator(database).await;

        let result = orchestrator
            .trigger_recovery("mongo: connection refused", BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(
            result,
            RecoveryResult::FallbackActive {
                adapter: "sqlite-degraded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_db_recovery_without_secondary_propagates_original_error() {
        let (orchestrator, queue) =
            orchestrator(DatabaseLayer::new(TestAdapter::failing("mongo"))).await;
        // Close the recovery queue so the default fallback cannot absorb
        // the failure either.
        queue.closed.store(true, Ordering::SeqCst);

        let err = orchestrator
            .trigger_recovery("MongoDB connection timeout", BTreeMap::new())
            .await
            .unwrap_err();
        match err {
            RecoveryError::Exhausted { message } => {
                assert_eq!(message, "MongoDB connection timeout");
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ai_provider_recovery_promotes_healthy_provider() {
        let (orchestrator, _) = orchestrator(DatabaseLayer::new(TestAdapter::named("mongo"))).await;
        let result = orchestrator
            .trigger_recovery("OpenAI returned 500", BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(
            result,
            RecoveryResult::ProviderSwitched {
                provider: "openai".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_ai_provider_without_healthy_falls_back_to_enqueue() {
        let gateway = healthy_gateway(&["openai"]).await;
        gateway.lock().await.mark_unavailable("openai").unwrap();
        let queue = Arc::new(TestQueue::named("recovery"));
        let orchestrator = RecoveryOrchestrator::new(
            gateway,
            Arc::new(DatabaseLayer::new(TestAdapter::named("mongo"))),
            Arc::clone(&queue),
            policy(),
        );

        let result = orchestrator
            .trigger_recovery("anthropic overloaded", BTreeMap::new())
            .await
            .unwrap();
        assert!(matches!(result, RecoveryResult::EnqueuedForRecovery { .. }));

        let added = queue.added.lock().unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].0, RECOVERY_JOB_TYPE);
        assert_eq!(added[0].2.attempts, 3);
        assert_eq!(added[0].2.backoff.initial_ms, 5_000);
    }

    #[tokio::test]
    async fn test_placeholder_strategies_return_noop() {
        let (orchestrator, _) = orchestrator(DatabaseLayer::new(TestAdapter::named("mongo"))).await;

        let email = orchestrator
            .trigger_recovery("SMTP handshake failed", BTreeMap::new())
            .await
            .unwrap();
        assert!(matches!(email, RecoveryResult::Noop { .. }));

        let vector = orchestrator
            .trigger_recovery("qdrant timed out", BTreeMap::new())
            .await
            .unwrap();
        assert!(matches!(vector, RecoveryResult::Noop { .. }));
    }

    #[tokio::test]
    async fn test_unknown_failure_enqueues_with_event_payload() {
        let (orchestrator, queue) =
            orchestrator(DatabaseLayer::new(TestAdapter::named("mongo"))).await;

        let context = BTreeMap::from([("job_id".to_string(), "42".to_string())]);
        let result = orchestrator
            .trigger_recovery("something inexplicable", context)
            .await
            .unwrap();
        assert!(matches!(result, RecoveryResult::EnqueuedForRecovery { .. }));

        let added = queue.added.lock().unwrap();
        let payload = &added[0].1;
        assert_eq!(payload["message"], "something inexplicable");
        assert_eq!(payload["context"]["job_id"], "42");
    }

    #[tokio::test]
    async fn test_escalation_fires_once_per_burst() {
        let sink = RecordingSink::default();
        let posted = sink.posted.clone();
        let gateway = healthy_gateway(&["openai"]).await;
        let queue = Arc::new(TestQueue::named("recovery"));
        let orchestrator = RecoveryOrchestrator::new(
            gateway,
            Arc::new(DatabaseLayer::new(TestAdapter::named("mongo"))),
            queue,
            policy(),
        )
        .with_alert_sink(sink);

        // Noop strategy keeps the loop simple; history still accumulates.
        for _ in 0..12 {
            orchestrator
                .trigger_recovery("smtp relay down", BTreeMap::new())
                .await
                .unwrap();
        }

        let posted = posted.lock().unwrap();
        assert_eq!(posted.len(), 1, "alerts: {posted:?}");
        assert!(posted[0].contains("email_service"));
    }

    #[tokio::test]
    async fn test_failing_alert_sink_never_breaks_recovery() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let gateway = healthy_gateway(&["openai"]).await;
        let queue = Arc::new(TestQueue::named("recovery"));
        let orchestrator = RecoveryOrchestrator::new(
            gateway,
            Arc::new(DatabaseLayer::new(TestAdapter::named("mongo"))),
            queue,
            policy(),
        )
        .with_alert_sink(sink);

        for _ in 0..11 {
            let result = orchestrator
                .trigger_recovery("smtp relay down", BTreeMap::new())
                .await;
            assert!(result.is_ok());
        }
    }

    #[tokio::test]
    async fn test_history_capped_at_ten() {
        let (orchestrator, _) = orchestrator(DatabaseLayer::new(TestAdapter::named("mongo"))).await;
        for _ in 0..25 {
            orchestrator
                .trigger_recovery("smtp relay down", BTreeMap::new())
                .await
                .unwrap();
        }
        assert_eq!(orchestrator.history_len(&FailureKind::EmailService), 10);
    }

    #[tokio::test]
    async fn test_replay_success_returns_replayed() {
        let (orchestrator, _) = orchestrator(DatabaseLayer::new(TestAdapter::named("mongo"))).await;
        let work = Arc::new(TestQueue::named("grant-discovery"));
        let job_id = work.push_failed("scrape-grants", "timeout");

        let results = orchestrator.trigger_recovery_for_queue(&work).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0], RecoveryResult::Replayed { job_id });
        assert!(work.failed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replay_failure_pauses_and_schedules_single_resume() {
        let (orchestrator, _) = orchestrator(DatabaseLayer::new(TestAdapter::named("mongo"))).await;
        let orchestrator = orchestrator.with_pause_resume(Duration::from_millis(50));

        let work = Arc::new(TestQueue::named("grant-discovery"));
        work.push_failed("scrape-grants", "timeout");
        work.push_failed("draft-proposal", "timeout");
        work.retry_fails.store(true, Ordering::SeqCst);

        let results = orchestrator.trigger_recovery_for_queue(&work).await.unwrap();
        assert!(results.is_empty());

        // One pause despite two failed replays.
        assert_eq!(work.pauses.load(Ordering::SeqCst), 1);
        assert!(work.paused.load(Ordering::SeqCst));

        // Exactly one resume fires after the configured delay.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(work.resumes.load(Ordering::SeqCst), 1);
        assert!(!work.paused.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_pause_can_reschedule_after_resume_completes() {
        let (orchestrator, _) = orchestrator(DatabaseLayer::new(TestAdapter::named("mongo"))).await;
        let orchestrator = orchestrator.with_pause_resume(Duration::from_millis(20));

        let work = Arc::new(TestQueue::named("grant-discovery"));
        work.retry_fails.store(true, Ordering::SeqCst);

        let job = rampart_types::queue::FailedJob {
            id: uuid::Uuid::now_v7(),
            job_type: "scrape-grants".to_string(),
            payload: serde_json::json!({}),
            attempts_made: 3,
            failed_reason: "timeout".to_string(),
        };

        assert!(orchestrator.process_recovery_job(&work, &job).await.is_err());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(work.resumes.load(Ordering::SeqCst), 1);

        // A failure after the window schedules a fresh pause/resume pair.
        assert!(orchestrator.process_recovery_job(&work, &job).await.is_err());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(work.pauses.load(Ordering::SeqCst), 2);
        assert_eq!(work.resumes.load(Ordering::SeqCst), 2);
    }
}
