//! Job queue port.
//!
//! The broker itself (BullMQ, Redis, whatever the deployment uses) is an
//! external collaborator; this trait is the surface the resilience core
//! consumes and produces. Uses RPITIT (native async fn in traits, Rust 2024
//! edition). Implementations live in rampart-infra.

pub mod monitor;

use rampart_types::queue::{FailedJob, JobHandle, JobOptions, QueueError, QueueSnapshot};
use uuid::Uuid;

/// Trait for a background job queue.
pub trait JobQueue: Send + Sync {
    /// Name of this queue (e.g. "grant-discovery", "recovery").
    fn name(&self) -> &str;

    /// Enqueue a job with the given retry options.
    fn add(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> impl std::future::Future<Output = Result<JobHandle, QueueError>> + Send;

    /// Current counters for this queue.
    fn job_counts(
        &self,
    ) -> impl std::future::Future<Output = Result<QueueSnapshot, QueueError>> + Send;

    /// Stop handing out waiting jobs.
    fn pause(&self) -> impl std::future::Future<Output = Result<(), QueueError>> + Send;

    /// Resume handing out waiting jobs.
    fn resume(&self) -> impl std::future::Future<Output = Result<(), QueueError>> + Send;

    /// Jobs that have exhausted their attempts.
    fn failed_jobs(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<FailedJob>, QueueError>> + Send;

    /// Replay one failed job. On success the job leaves the failed set and
    /// a fresh handle is returned.
    fn retry_job(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<JobHandle, QueueError>> + Send;
}

#[cfg(test)]
pub(crate) mod test_queue {
    //! Controllable in-process queue double shared by the orchestrator,
    //! monitor, and chaos tests.

    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    use rampart_types::queue::{FailedJob, JobHandle, JobOptions, QueueError, QueueSnapshot};
    use uuid::Uuid;

    use super::JobQueue;

    #[derive(Default)]
    pub struct TestQueue {
        pub name: String,
        pub counts: Mutex<QueueSnapshot>,
        pub failed: Mutex<Vec<FailedJob>>,
        pub added: Mutex<Vec<(String, serde_json::Value, JobOptions)>>,
        pub paused: AtomicBool,
        pub pauses: AtomicU64,
        pub resumes: AtomicU64,
        /// When set, `add` and `retry_job` fail with `QueueError::Closed`.
        pub closed: AtomicBool,
        /// When set, `retry_job` fails even for known jobs.
        pub retry_fails: AtomicBool,
    }

    impl TestQueue {
        pub fn named(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Default::default()
            }
        }

        pub fn push_failed(&self, job_type: &str, reason: &str) -> Uuid {
            let id = Uuid::now_v7();
            self.failed.lock().unwrap().push(FailedJob {
                id,
                job_type: job_type.to_string(),
                payload: serde_json::json!({}),
                attempts_made: 3,
                failed_reason: reason.to_string(),
            });
            id
        }

        pub fn set_counts(&self, snapshot: QueueSnapshot) {
            *self.counts.lock().unwrap() = snapshot;
        }
    }

    impl JobQueue for TestQueue {
        fn name(&self) -> &str {
            &self.name
        }

        async fn add(
            &self,
            job_type: &str,
            payload: serde_json::Value,
            options: JobOptions,
        ) -> Result<JobHandle, QueueError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(QueueError::Closed);
            }
            let handle = JobHandle {
                id: Uuid::now_v7(),
                job_type: job_type.to_string(),
            };
            self.added
                .lock()
                .unwrap()
                .push((job_type.to_string(), payload, options));
            Ok(handle)
        }

        async fn job_counts(&self) -> Result<QueueSnapshot, QueueError> {
            Ok(*self.counts.lock().unwrap())
        }

        async fn pause(&self) -> Result<(), QueueError> {
            self.paused.store(true, Ordering::SeqCst);
            self.pauses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn resume(&self) -> Result<(), QueueError> {
            self.paused.store(false, Ordering::SeqCst);
            self.resumes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn failed_jobs(&self) -> Result<Vec<FailedJob>, QueueError> {
            Ok(self.failed.lock().unwrap().clone())
        }

        async fn retry_job(&self, id: Uuid) -> Result<JobHandle, QueueError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(QueueError::Closed);
            }
            if self.retry_fails.load(Ordering::SeqCst) {
                return Err(QueueError::OperationFailed("replay failed".to_string()));
            }
            let mut failed = self.failed.lock().unwrap();
            let Some(pos) = failed.iter().position(|j| j.id == id) else {
                return Err(QueueError::JobNotFound(id));
            };
            let job = failed.remove(pos);
            Ok(JobHandle {
                id: job.id,
                job_type: job.job_type,
            })
        }
    }
}
