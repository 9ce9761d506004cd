use std::fmt;

use chrono::{DateTime, Utc};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Identity;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The kind of work a background job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    /// Building the container image of a service.
    Build,

    /// Deploying a service to the orchestration platform.
    Deploy,

    /// Removing a service from the orchestration platform.
    Undeploy,
}

/// The status of a background job.
///
/// ```text
/// PENDING -> RUNNING -> DONE
///                    -> ERROR
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Requested but not started.
    Pending,

    /// Work in progress.
    Running,

    /// Finished successfully.
    Done,

    /// Finished with an error.
    Error,
}

/// The logical key of a background job. At most one non-terminal job exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, CopyGetters)]
pub struct JobKey {
    /// The service the job works on.
    #[getset(get = "pub with_prefix")]
    service: Identity,

    /// The kind of work.
    #[getset(get_copy = "pub with_prefix")]
    job_type: JobType,
}

/// A recorded background operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct MicoServiceBackgroundJob {
    /// The surrogate id of the job.
    #[getset(get_copy = "pub with_prefix")]
    pub(crate) id: Uuid,

    /// The logical key of the job.
    #[getset(get = "pub with_prefix")]
    pub(crate) key: JobKey,

    /// The current status.
    #[getset(get_copy = "pub with_prefix")]
    pub(crate) status: JobStatus,

    /// The result payload of a finished job.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[getset(get = "pub with_prefix")]
    pub(crate) result: Option<serde_json::Value>,

    /// The error message of a failed job.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[getset(get = "pub with_prefix")]
    pub(crate) error_message: Option<String>,

    /// When the job was submitted.
    #[getset(get_copy = "pub with_prefix")]
    pub(crate) created_at: DateTime<Utc>,

    /// When the job last changed status.
    #[getset(get_copy = "pub with_prefix")]
    pub(crate) updated_at: DateTime<Utc>,

    /// Submission order, used to break ties between equal timestamps.
    #[serde(skip)]
    pub(crate) sequence: u64,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl JobStatus {
    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Done)
                | (JobStatus::Pending, JobStatus::Error)
                | (JobStatus::Running, JobStatus::Done)
                | (JobStatus::Running, JobStatus::Error)
        )
    }
}

impl JobKey {
    /// Creates a new job key.
    pub fn new(service: Identity, job_type: JobType) -> Self {
        Self { service, job_type }
    }

    /// Whether the key belongs to the given service.
    pub fn is_for(&self, short_name: &str, version: &str) -> bool {
        self.service.matches(short_name, version)
    }
}

impl MicoServiceBackgroundJob {
    pub(crate) fn pending(key: JobKey, sequence: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            key,
            status: JobStatus::Pending,
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            sequence,
        }
    }

    /// Whether the job is pending or running.
    pub fn is_in_flight(&self) -> bool {
        !self.status.is_terminal()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Done => "DONE",
            JobStatus::Error => "ERROR",
        };
        write!(f, "{}", status)
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let job_type = match self {
            JobType::Build => "BUILD",
            JobType::Deploy => "DEPLOY",
            JobType::Undeploy => "UNDEPLOY",
        };
        write!(f, "{}", job_type)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.job_type)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_transitions() {
        for next in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Done,
            JobStatus::Error,
        ] {
            assert!(!JobStatus::Done.can_transition_to(next));
            assert!(!JobStatus::Error.can_transition_to(next));
        }

        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn test_job_type_serializes_uppercase() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&JobType::Undeploy)?, r#""UNDEPLOY""#);
        assert_eq!(JobStatus::Running.to_string(), "RUNNING");

        Ok(())
    }
}
