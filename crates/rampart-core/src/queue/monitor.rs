//! Queue health monitoring.
//!
//! Samples a queue's counters on a fixed tick and hands rising failure
//! counts to the recovery orchestrator. State is one previous snapshot,
//! reset at process start.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rampart_types::queue::QueueSnapshot;

use crate::recovery::RecoveryOrchestrator;

use super::JobQueue;

/// Periodic watcher for one queue.
///
/// `Q` is the monitored queue; `R` is the orchestrator's recovery queue
/// (often the same type, not necessarily the same queue).
pub struct QueueHealthMonitor<Q: JobQueue + 'static, R: JobQueue> {
    queue: Arc<Q>,
    orchestrator: Arc<RecoveryOrchestrator<R>>,
    tick: Duration,
    previous: Option<QueueSnapshot>,
}

impl<Q: JobQueue + 'static, R: JobQueue> QueueHealthMonitor<Q, R> {
    pub fn new(queue: Arc<Q>, orchestrator: Arc<RecoveryOrchestrator<R>>, tick: Duration) -> Self {
        Self {
            queue,
            orchestrator,
            tick,
            previous: None,
        }
    }

    /// Read the counters once and react.
    ///
    /// Logs only when the snapshot changed or there is non-zero
    /// waiting/active/failed activity, to keep an idle system quiet. When
    /// `failed` increased since the previous tick, triggers queue recovery.
    pub async fn tick(&mut self) {
        let snapshot = match self.queue.job_counts().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(queue = %self.queue.name(), error = %err, "Failed to read queue counters");
                return;
            }
        };

        let changed = self.previous.map_or(true, |prev| prev != snapshot);
        if changed || snapshot.has_activity() {
            tracing::info!(
                queue = %self.queue.name(),
                waiting = snapshot.waiting,
                active = snapshot.active,
                completed = snapshot.completed,
                failed = snapshot.failed,
                "Queue counters"
            );
        }

        if let Some(prev) = self.previous {
            if snapshot.failed > prev.failed {
                tracing::warn!(
                    queue = %self.queue.name(),
                    previous_failed = prev.failed,
                    failed = snapshot.failed,
                    "Failed job count rose, triggering queue recovery"
                );
                if let Err(err) = self
                    .orchestrator
                    .trigger_recovery_for_queue(&self.queue)
                    .await
                {
                    tracing::error!(queue = %self.queue.name(), error = %err, "Queue recovery failed");
                }
            }
        }

        self.previous = Some(snapshot);
    }

    /// Run the tick loop until the token is cancelled.
    pub async fn run(mut self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(queue = %self.queue.name(), "Queue monitor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }
}
