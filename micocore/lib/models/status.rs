use serde::{Deserialize, Serialize};

use super::MicoServiceBackgroundJob;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The lifecycle phase of a pod as reported by the orchestration platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    /// Accepted but not all containers are running yet.
    Pending,

    /// Bound to a node with all containers created.
    Running,

    /// All containers terminated successfully.
    Succeeded,

    /// All containers terminated and at least one failed.
    Failed,

    /// The state could not be obtained.
    Unknown,
}

/// Resource usage of a single pod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PodMetrics {
    /// CPU load of the pod.
    pub cpu_load: f64,

    /// Memory usage of the pod.
    pub memory_usage: f64,
}

/// A pod belonging to a service's deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodInformation {
    /// The name of the pod.
    pub pod_name: String,

    /// The node the pod is scheduled on.
    pub host_node: String,

    /// The lifecycle phase.
    pub phase: PodPhase,

    /// The resource usage.
    pub metrics: PodMetrics,
}

/// Average resource usage of the pods of one service on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// The name of the node.
    pub node_name: String,

    /// The average CPU load of the service's pods on the node.
    pub average_cpu_load: f64,

    /// The average memory usage of the service's pods on the node.
    pub average_memory_usage: f64,
}

/// A declared interface of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInterfaceStatus {
    /// The name of the interface.
    pub name: String,
}

/// A point-in-time status of one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// The human readable name of the service.
    pub name: String,

    /// The short name of the service.
    pub short_name: String,

    /// The version of the service.
    pub version: String,

    /// The desired number of replicas.
    pub requested_replicas: u32,

    /// The number of replicas the platform reports as available.
    pub available_replicas: u32,

    /// The declared interfaces.
    pub interfaces: Vec<ServiceInterfaceStatus>,

    /// The pods of the service's deployment.
    pub pods: Vec<PodInformation>,

    /// Per-node averages, sorted by node name.
    pub node_metrics: Vec<NodeMetrics>,

    /// Pending and running background jobs of the service.
    pub in_flight_jobs: Vec<MicoServiceBackgroundJob>,

    /// Everything that went wrong while computing this status.
    pub error_messages: Vec<String>,
}

/// Whether an application has an active deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    /// The platform reports an active deployment.
    Deployed,

    /// No active deployment, or the platform could not tell.
    #[default]
    NotDeployed,
}

/// A point-in-time status of an application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationStatus {
    /// The short name of the application.
    pub short_name: String,

    /// The version of the application.
    pub version: String,

    /// Whether the application is deployed.
    pub deployment_status: DeploymentStatus,

    /// The status of every referenced service, in application order.
    pub service_statuses: Vec<ServiceStatus>,

    /// The sum of the requested replicas.
    pub total_requested_replicas: u32,

    /// The sum of the available replicas.
    pub total_available_replicas: u32,

    /// The number of pods across all services.
    pub total_pods: usize,

    /// Application-level failures.
    pub error_messages: Vec<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServiceStatus {
    /// Whether any part of the status could not be computed.
    pub fn has_errors(&self) -> bool {
        !self.error_messages.is_empty()
    }
}

impl ApplicationStatus {
    /// Whether the application or any of its services reported an error.
    pub fn has_errors(&self) -> bool {
        !self.error_messages.is_empty() || self.service_statuses.iter().any(|s| s.has_errors())
    }
}
