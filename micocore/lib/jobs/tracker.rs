use std::{collections::HashMap, future::Future, sync::Arc};

use chrono::Utc;
use tokio::{sync::Mutex, task::JoinHandle};
use uuid::Uuid;

use crate::{
    config::DEFAULT_JOB_HISTORY_LIMIT,
    models::{JobKey, JobStatus, MicoServiceBackgroundJob},
    MicoError, MicoResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A process-wide registry of background jobs.
///
/// At most one pending or running job exists per [`JobKey`]. Checking for an in-flight job and
/// inserting a new one happen under a single lock, so concurrent submissions for the same key
/// yield exactly one new job.
#[derive(Debug)]
pub struct BackgroundJobTracker {
    registry: Mutex<JobRegistry>,
    history_limit: usize,
}

/// The outcome of [`BackgroundJobTracker::spawn_tracked`].
#[derive(Debug)]
pub struct SpawnedJob {
    /// The job now current for the key.
    pub job: MicoServiceBackgroundJob,

    /// The task running the work, if a new job was created.
    pub handle: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct JobRegistry {
    jobs: HashMap<Uuid, MicoServiceBackgroundJob>,
    current: HashMap<JobKey, Uuid>,
    sequence: u64,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl BackgroundJobTracker {
    /// Creates a tracker keeping up to `history_limit` terminal jobs per key.
    pub fn new(history_limit: usize) -> Self {
        Self {
            registry: Mutex::new(JobRegistry::default()),
            history_limit,
        }
    }

    /// Requests a job for `key`.
    ///
    /// If a pending or running job already exists for the key it is returned unchanged and no
    /// new job is created. Otherwise a new pending job is created and becomes the current job of
    /// the key.
    pub async fn submit(&self, key: JobKey) -> MicoServiceBackgroundJob {
        self.submit_inner(key).await.0
    }

    /// Moves a pending job to running.
    pub async fn mark_running(&self, job_id: Uuid) -> MicoResult<MicoServiceBackgroundJob> {
        self.transition(job_id, JobStatus::Running, |_| {}).await
    }

    /// Finishes a job successfully with an optional result payload.
    pub async fn mark_done(
        &self,
        job_id: Uuid,
        result: Option<serde_json::Value>,
    ) -> MicoResult<MicoServiceBackgroundJob> {
        self.transition(job_id, JobStatus::Done, |job| job.result = result)
            .await
    }

    /// Finishes a job with an error.
    pub async fn mark_error(
        &self,
        job_id: Uuid,
        message: impl Into<String>,
    ) -> MicoResult<MicoServiceBackgroundJob> {
        let message = message.into();
        self.transition(job_id, JobStatus::Error, |job| {
            job.error_message = Some(message)
        })
        .await
    }

    /// Returns the job with the given id.
    pub async fn get(&self, job_id: Uuid) -> MicoResult<MicoServiceBackgroundJob> {
        self.registry
            .lock()
            .await
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or(MicoError::JobNotFound(job_id))
    }

    /// Returns the most recent job for the key, terminal or not.
    pub async fn get_current_status(&self, key: &JobKey) -> Option<MicoServiceBackgroundJob> {
        let registry = self.registry.lock().await;
        registry
            .current
            .get(key)
            .and_then(|id| registry.jobs.get(id))
            .cloned()
    }

    /// Returns every retained job of a service regardless of type, most recent first.
    pub async fn list_by_service(
        &self,
        short_name: &str,
        version: &str,
    ) -> Vec<MicoServiceBackgroundJob> {
        let registry = self.registry.lock().await;
        newest_first(
            registry
                .jobs
                .values()
                .filter(|job| job.key.is_for(short_name, version))
                .cloned()
                .collect(),
        )
    }

    /// Returns the pending and running jobs of a service, most recent first.
    pub async fn list_in_flight(
        &self,
        short_name: &str,
        version: &str,
    ) -> Vec<MicoServiceBackgroundJob> {
        let mut jobs = self.list_by_service(short_name, version).await;
        jobs.retain(MicoServiceBackgroundJob::is_in_flight);
        jobs
    }

    /// Returns every retained job, most recent first.
    pub async fn list_all(&self) -> Vec<MicoServiceBackgroundJob> {
        let registry = self.registry.lock().await;
        newest_first(registry.jobs.values().cloned().collect())
    }

    /// Submits a job for `key` and, only if a new job was created, runs `work` on a tokio task.
    ///
    /// The job is marked running before `work` starts, then done with the returned payload or
    /// failed with the error message.
    pub async fn spawn_tracked<F, Fut>(self: &Arc<Self>, key: JobKey, work: F) -> SpawnedJob
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = MicoResult<serde_json::Value>> + Send + 'static,
    {
        let (job, created) = self.submit_inner(key).await;
        if !created {
            return SpawnedJob { job, handle: None };
        }

        let tracker = Arc::clone(self);
        let job_id = job.id;
        let handle = tokio::spawn(async move {
            if let Err(e) = tracker.mark_running(job_id).await {
                tracing::error!(job = %job_id, error = %e, "could not start background job");
                return;
            }

            let outcome = match work().await {
                Ok(result) => tracker.mark_done(job_id, Some(result)).await,
                Err(e) => tracker.mark_error(job_id, e.to_string()).await,
            };

            if let Err(e) = outcome {
                tracing::error!(job = %job_id, error = %e, "could not finish background job");
            }
        });

        SpawnedJob {
            job,
            handle: Some(handle),
        }
    }

    async fn submit_inner(&self, key: JobKey) -> (MicoServiceBackgroundJob, bool) {
        let mut registry = self.registry.lock().await;

        let in_flight = registry
            .current
            .get(&key)
            .and_then(|id| registry.jobs.get(id))
            .filter(|job| job.is_in_flight())
            .cloned();
        if let Some(job) = in_flight {
            tracing::debug!(key = %key, job = %job.id, "job already in flight");
            return (job, false);
        }

        registry.sequence += 1;
        let job = MicoServiceBackgroundJob::pending(key.clone(), registry.sequence);
        registry.current.insert(key.clone(), job.id);
        registry.jobs.insert(job.id, job.clone());
        registry.prune(&key, self.history_limit);

        tracing::info!(key = %key, job = %job.id, "submitted background job");
        (job, true)
    }

    async fn transition(
        &self,
        job_id: Uuid,
        to: JobStatus,
        update: impl FnOnce(&mut MicoServiceBackgroundJob),
    ) -> MicoResult<MicoServiceBackgroundJob> {
        let mut registry = self.registry.lock().await;
        let job = registry
            .jobs
            .get_mut(&job_id)
            .ok_or(MicoError::JobNotFound(job_id))?;

        if !job.status.can_transition_to(to) {
            return Err(MicoError::InvalidTransition {
                job_id,
                from: job.status,
                to,
            });
        }

        update(job);
        job.status = to;
        job.updated_at = Utc::now();

        tracing::info!(key = %job.key, job = %job_id, status = %to, "background job changed status");
        Ok(job.clone())
    }
}

impl JobRegistry {
    /// Drops the oldest terminal jobs of `key` beyond `limit`. The current job is kept.
    fn prune(&mut self, key: &JobKey, limit: usize) {
        let current = self.current.get(key).copied();
        let mut terminal: Vec<(u64, Uuid)> = self
            .jobs
            .values()
            .filter(|job| &job.key == key && !job.is_in_flight() && Some(job.id) != current)
            .map(|job| (job.sequence, job.id))
            .collect();

        if terminal.len() <= limit {
            return;
        }

        terminal.sort_unstable();
        let excess = terminal.len() - limit;
        for (_, id) in terminal.into_iter().take(excess) {
            self.jobs.remove(&id);
        }
        tracing::debug!(key = %key, pruned = excess, "pruned background job history");
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for BackgroundJobTracker {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_HISTORY_LIMIT)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn newest_first(mut jobs: Vec<MicoServiceBackgroundJob>) -> Vec<MicoServiceBackgroundJob> {
    jobs.sort_by(|a, b| b.sequence.cmp(&a.sequence));
    jobs
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
