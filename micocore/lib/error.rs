use std::{
    error::Error,
    fmt::{self, Display},
    time::Duration,
};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Identity, JobStatus};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a micocore-related operation.
pub type MicoResult<T> = Result<T, MicoError>;

/// An error that occurred while operating on the service catalog, the application composer, the
/// background job tracker or the orchestration platform.
#[derive(Debug, Error)]
pub enum MicoError {
    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML (de)serialization error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An error that can represent any error.
    #[error(transparent)]
    Custom(#[from] AnyError),

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    ConfigValidation(String),

    /// No service exists for the given identity.
    #[error("service '{0}' was not found")]
    ServiceNotFound(Identity),

    /// No version of the service exists.
    #[error("no version of service '{0}' was found")]
    ServiceVersionsNotFound(String),

    /// No application exists for the given identity.
    #[error("application '{0}' was not found")]
    ApplicationNotFound(Identity),

    /// No version of the application exists.
    #[error("no version of application '{0}' was found")]
    ApplicationVersionsNotFound(String),

    /// The application does not reference a service with the given short name.
    #[error("application '{application}' does not include service '{service_short_name}'")]
    ServiceNotInApplication {
        /// The application that was looked up.
        application: Identity,

        /// The short name of the service that is missing.
        service_short_name: String,
    },

    /// The application references the service but no deployment information is stored for it.
    #[error(
        "service deployment information for service '{service_short_name}' in application '{application}' could not be found"
    )]
    DeploymentInfoNotFound {
        /// The application that was looked up.
        application: Identity,

        /// The short name of the service whose deployment information is missing.
        service_short_name: String,
    },

    /// No background job exists with the given id.
    #[error("background job '{0}' was not found")]
    JobNotFound(Uuid),

    /// A service with the same identity already exists.
    #[error("service '{0}' already exists")]
    ServiceAlreadyExists(Identity),

    /// An application with the same identity already exists.
    #[error("application '{0}' already exists")]
    ApplicationAlreadyExists(Identity),

    /// The dependency edge already exists.
    #[error("service '{service}' already depends on service '{depended_service}'")]
    DependencyAlreadyExists {
        /// The depending service.
        service: Identity,

        /// The depended service.
        depended_service: Identity,
    },

    /// A service cannot depend on itself.
    #[error("service '{0}' cannot depend on itself")]
    SelfDependency(Identity),

    /// The version of the depended service does not satisfy the requested range.
    #[error("service '{target}' does not satisfy the version range '{range}'")]
    VersionConstraintUnsatisfied {
        /// The depended service.
        target: Identity,

        /// The requested version range.
        range: String,
    },

    /// The identity in the payload differs from the addressed identity.
    #[error("identity '{actual}' of the payload does not match the addressed identity '{expected}'")]
    IdentityMismatch {
        /// The addressed identity.
        expected: Identity,

        /// The identity found in the payload.
        actual: Identity,
    },

    /// The service cannot be deleted while other services depend on it.
    #[error("service '{service}' is still used by {} depending service(s)", .dependers.len())]
    HasDependers {
        /// The service that should have been deleted.
        service: Identity,

        /// The services depending on it.
        dependers: Vec<Identity>,
    },

    /// The service is currently deployed.
    #[error("service '{0}' is currently deployed")]
    ServiceIsDeployed(Identity),

    /// The application is currently deployed.
    #[error("application '{0}' is currently deployed")]
    ApplicationIsDeployed(Identity),

    /// The job cannot move from its current status to the requested one.
    #[error("background job '{job_id}' cannot transition from {from} to {to}")]
    InvalidTransition {
        /// The job that was addressed.
        job_id: Uuid,

        /// The current status of the job.
        from: JobStatus,

        /// The requested status.
        to: JobStatus,
    },

    /// The application's services and deployment information disagree.
    #[error("application '{0}' has inconsistent service references: {1}")]
    InconsistentApplication(Identity, String),

    /// A call to the orchestration platform failed.
    #[error("orchestration call '{operation}' failed: {reason}")]
    OrchestrationFailed {
        /// The operation that was attempted.
        operation: String,

        /// Why it failed.
        reason: String,
    },

    /// A call to the orchestration platform did not complete in time.
    #[error("orchestration call '{operation}' timed out after {timeout:?}")]
    OrchestrationTimeout {
        /// The operation that was attempted.
        operation: String,

        /// The timeout that elapsed.
        timeout: Duration,
    },
}

/// The category of a [`MicoError`], used by callers to decide how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An entity is absent.
    NotFound,

    /// An identity or an edge collides with an existing one.
    AlreadyExists,

    /// The payload identity disagrees with the addressed identity.
    IdentityMismatch,

    /// A delete is blocked by the dependency graph.
    HasDependers,

    /// A delete is blocked by the live orchestration state.
    IsDeployed,

    /// A background job state machine violation.
    InvalidTransition,

    /// The orchestration platform could not answer.
    Orchestration,

    /// Anything else.
    Other,
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MicoError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> MicoError {
        MicoError::Custom(AnyError {
            error: error.into(),
        })
    }

    /// Returns the category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MicoError::ServiceNotFound(_)
            | MicoError::ServiceVersionsNotFound(_)
            | MicoError::ApplicationNotFound(_)
            | MicoError::ApplicationVersionsNotFound(_)
            | MicoError::ServiceNotInApplication { .. }
            | MicoError::DeploymentInfoNotFound { .. }
            | MicoError::JobNotFound(_) => ErrorKind::NotFound,
            MicoError::ServiceAlreadyExists(_)
            | MicoError::ApplicationAlreadyExists(_)
            | MicoError::DependencyAlreadyExists { .. } => ErrorKind::AlreadyExists,
            MicoError::IdentityMismatch { .. } => ErrorKind::IdentityMismatch,
            MicoError::HasDependers { .. } => ErrorKind::HasDependers,
            MicoError::ServiceIsDeployed(_) | MicoError::ApplicationIsDeployed(_) => {
                ErrorKind::IsDeployed
            }
            MicoError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            MicoError::OrchestrationFailed { .. } | MicoError::OrchestrationTimeout { .. } => {
                ErrorKind::Orchestration
            }
            _ => ErrorKind::Other,
        }
    }
}

impl ErrorKind {
    /// Whether the error is an integrity guard that callers should treat as an expected
    /// precondition failure rather than a crash.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::HasDependers | ErrorKind::IsDeployed)
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `MicoResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> MicoResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let id = Identity::new("svc-a", "1.0.0");

        assert_eq!(
            MicoError::ServiceNotFound(id.clone()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            MicoError::DependencyAlreadyExists {
                service: id.clone(),
                depended_service: Identity::new("svc-b", "1.0.0"),
            }
            .kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            MicoError::ServiceIsDeployed(id.clone()).kind(),
            ErrorKind::IsDeployed
        );
        assert_eq!(
            MicoError::ConfigValidation("bad".into()).kind(),
            ErrorKind::Other
        );
        assert!(ErrorKind::HasDependers.is_recoverable());
        assert!(ErrorKind::IsDeployed.is_recoverable());
        assert!(!ErrorKind::NotFound.is_recoverable());
    }

    #[test]
    fn test_not_found_messages_are_distinct() {
        let app = Identity::new("app", "1.0.0");
        let missing_service = MicoError::ServiceNotInApplication {
            application: app.clone(),
            service_short_name: "svc-a".into(),
        };
        let missing_info = MicoError::DeploymentInfoNotFound {
            application: app,
            service_short_name: "svc-a".into(),
        };

        assert_eq!(missing_service.kind(), missing_info.kind());
        assert_ne!(missing_service.to_string(), missing_info.to_string());
    }
}
