use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    models::{MicoApplication, MicoService, PodPhase},
    MicoError, MicoResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A pod of a service's deployment as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodFacts {
    /// The name of the pod.
    pub pod_name: String,

    /// The node the pod runs on.
    pub host_node: String,

    /// The lifecycle phase of the pod.
    pub phase: PodPhase,

    /// The CPU load of the pod.
    #[serde(default)]
    pub cpu_load: f64,

    /// The memory usage of the pod.
    #[serde(default)]
    pub memory_usage: f64,
}

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Read-only queries against the container-orchestration platform.
///
/// Implementations may block on the network; callers bound every call with [`with_timeout`].
#[async_trait::async_trait]
pub trait OrchestrationClient: Send + Sync {
    /// Whether the platform has an active deployment for the service.
    async fn is_service_deployed(&self, service: &MicoService) -> MicoResult<bool>;

    /// Whether the platform has an active deployment for the application.
    async fn is_application_deployed(&self, application: &MicoApplication) -> MicoResult<bool>;

    /// Lists the pods of the service's deployment.
    async fn list_pods(&self, service: &MicoService) -> MicoResult<Vec<PodFacts>>;

    /// Returns the number of replicas the platform reports as available.
    async fn get_available_replicas(&self, service: &MicoService) -> MicoResult<u32>;
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Runs an orchestration call, failing with [`MicoError::OrchestrationTimeout`] if it does not
/// complete within `timeout`.
pub async fn with_timeout<T, F>(timeout: Duration, operation: &str, call: F) -> MicoResult<T>
where
    F: Future<Output = MicoResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?timeout, "orchestration call timed out");
            Err(MicoError::OrchestrationTimeout {
                operation: operation.to_string(),
                timeout,
            })
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
