//! In-memory `JobQueue` implementation.
//!
//! Single-process queue with the same observable surface as an external
//! broker: counters, pause/resume, a failed set, and replay. Jobs are not
//! executed here; workers pull with [`InMemoryJobQueue::take_next`] and
//! report back with `complete` / `fail`.

use std::collections::VecDeque;
use std::sync::Mutex;

use rampart_core::queue::JobQueue;
use rampart_types::queue::{FailedJob, JobHandle, JobOptions, QueueError, QueueSnapshot};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub options: JobOptions,
    pub attempts_made: u32,
}

/// Failed-set entry; keeps the options the job was added with so a replay
/// restores the original retry budget and backoff.
#[derive(Debug, Clone)]
struct FailedEntry {
    job: FailedJob,
    options: JobOptions,
}

#[derive(Debug, Default)]
struct QueueState {
    waiting: VecDeque<QueuedJob>,
    active: Vec<QueuedJob>,
    failed: Vec<FailedEntry>,
    completed: u64,
    paused: bool,
    closed: bool,
}

/// Process-local queue behind the `JobQueue` port.
pub struct InMemoryJobQueue {
    name: String,
    state: Mutex<QueueState>,
}

impl InMemoryJobQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Refuse further adds and replays. Existing counters stay readable.
    pub fn close(&self) {
        self.state.lock().expect("queue state poisoned").closed = true;
    }

    /// Pop the oldest waiting job and mark it active. `None` while paused
    /// or empty.
    pub fn take_next(&self) -> Option<QueuedJob> {
        let mut state = self.state.lock().expect("queue state poisoned");
        if state.paused {
            return None;
        }
        let mut job = state.waiting.pop_front()?;
        job.attempts_made += 1;
        state.active.push(job.clone());
        Some(job)
    }

    /// Report an active job finished.
    pub fn complete(&self, id: Uuid) -> Result<(), QueueError> {
        let mut state = self.state.lock().expect("queue state poisoned");
        let idx = state
            .active
            .iter()
            .position(|j| j.id == id)
            .ok_or(QueueError::JobNotFound(id))?;
        state.active.remove(idx);
        state.completed += 1;
        Ok(())
    }

    /// Report an active job failed. Re-queues while attempts remain,
    /// otherwise moves the job to the failed set.
    pub fn fail(&self, id: Uuid, reason: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().expect("queue state poisoned");
        let idx = state
            .active
            .iter()
            .position(|j| j.id == id)
            .ok_or(QueueError::JobNotFound(id))?;
        let job = state.active.remove(idx);
        if job.attempts_made < job.options.attempts {
            tracing::debug!(
                job_id = %job.id,
                attempt = job.attempts_made,
                of = job.options.attempts,
                delay_ms = job.options.backoff.delay_ms(job.attempts_made),
                "Job failed, will retry"
            );
            state.waiting.push_back(job);
        } else {
            tracing::warn!(job_id = %job.id, job_type = %job.job_type, reason, "Job exhausted its attempts");
            state.failed.push(FailedEntry {
                job: FailedJob {
                    id: job.id,
                    job_type: job.job_type,
                    payload: job.payload,
                    attempts_made: job.attempts_made,
                    failed_reason: reason.to_string(),
                },
                options: job.options,
            });
        }
        Ok(())
    }
}

impl JobQueue for InMemoryJobQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<JobHandle, QueueError> {
        let mut state = self.state.lock().expect("queue state poisoned");
        if state.closed {
            return Err(QueueError::Closed);
        }
        let id = Uuid::now_v7();
        state.waiting.push_back(QueuedJob {
            id,
            job_type: job_type.to_string(),
            payload,
            options,
            attempts_made: 0,
        });
        Ok(JobHandle {
            id,
            job_type: job_type.to_string(),
        })
    }

    async fn job_counts(&self) -> Result<QueueSnapshot, QueueError> {
        let state = self.state.lock().expect("queue state poisoned");
        Ok(QueueSnapshot {
            waiting: state.waiting.len() as u64,
            active: state.active.len() as u64,
            completed: state.completed,
            failed: state.failed.len() as u64,
        })
    }

    async fn pause(&self) -> Result<(), QueueError> {
        self.state.lock().expect("queue state poisoned").paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), QueueError> {
        self.state.lock().expect("queue state poisoned").paused = false;
        Ok(())
    }

    async fn failed_jobs(&self) -> Result<Vec<FailedJob>, QueueError> {
        Ok(self
            .state
            .lock()
            .expect("queue state poisoned")
            .failed
            .iter()
            .map(|entry| entry.job.clone())
            .collect())
    }

    async fn retry_job(&self, id: Uuid) -> Result<JobHandle, QueueError> {
        let mut state = self.state.lock().expect("queue state poisoned");
        if state.closed {
            return Err(QueueError::Closed);
        }
        let idx = state
            .failed
            .iter()
            .position(|entry| entry.job.id == id)
            .ok_or(QueueError::JobNotFound(id))?;
        let entry = state.failed.remove(idx);
        state.waiting.push_back(QueuedJob {
            id: entry.job.id,
            job_type: entry.job.job_type.clone(),
            payload: entry.job.payload,
            options: entry.options,
            attempts_made: 0,
        });
        Ok(JobHandle {
            id: entry.job.id,
            job_type: entry.job.job_type,
        })
    }
}
