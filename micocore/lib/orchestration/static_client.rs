use std::{
    collections::{HashMap, HashSet},
    path::Path,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    models::{Identity, MicoApplication, MicoService},
    MicoError, MicoResult,
};

use super::{OrchestrationClient, PodFacts};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A description of what is running on a cluster, as read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterFacts {
    /// The service deployments.
    #[serde(default)]
    pub services: Vec<ServiceFacts>,

    /// The applications with an active deployment.
    #[serde(default)]
    pub applications: Vec<Identity>,
}

/// The deployment of one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceFacts {
    /// The deployed service.
    pub service: Identity,

    /// Whether the deployment object is active.
    #[serde(default = "default_deployed")]
    pub deployed: bool,

    /// The replicas reported as available.
    #[serde(default)]
    pub available_replicas: u32,

    /// The pods of the deployment.
    #[serde(default)]
    pub pods: Vec<PodFacts>,
}

/// An [`OrchestrationClient`] that answers from facts held in memory.
///
/// Used by the `mico` binary, which loads the facts from a file, and by tests, which can also
/// make services unreachable or slow down every call.
#[derive(Debug, Default)]
pub struct StaticClusterClient {
    services: RwLock<HashMap<Identity, ServiceFacts>>,
    applications: RwLock<HashSet<Identity>>,
    unreachable: RwLock<HashSet<Identity>>,
    latency: Option<Duration>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StaticClusterClient {
    /// Creates a client answering from `facts`.
    pub fn new(facts: ClusterFacts) -> Self {
        Self {
            services: RwLock::new(
                facts
                    .services
                    .into_iter()
                    .map(|f| (f.service.clone(), f))
                    .collect(),
            ),
            applications: RwLock::new(facts.applications.into_iter().collect()),
            unreachable: RwLock::new(HashSet::new()),
            latency: None,
        }
    }

    /// Reads the facts from a JSON file.
    pub async fn from_file(path: impl AsRef<Path>) -> MicoResult<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        let facts: ClusterFacts = serde_json::from_str(&contents)?;

        tracing::debug!(
            path = %path.as_ref().display(),
            services = facts.services.len(),
            applications = facts.applications.len(),
            "loaded cluster facts"
        );
        Ok(Self::new(facts))
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Records or replaces the deployment of a service.
    pub async fn set_service(&self, facts: ServiceFacts) {
        self.services
            .write()
            .await
            .insert(facts.service.clone(), facts);
    }

    /// Removes the deployment of a service.
    pub async fn remove_service(&self, service: &Identity) {
        self.services.write().await.remove(service);
    }

    /// Marks an application as deployed or not.
    pub async fn set_application_deployed(&self, application: Identity, deployed: bool) {
        let mut applications = self.applications.write().await;
        if deployed {
            applications.insert(application);
        } else {
            applications.remove(&application);
        }
    }

    /// Makes every query about the service fail as if the platform were unreachable.
    pub async fn set_unreachable(&self, service: Identity, unreachable: bool) {
        let mut set = self.unreachable.write().await;
        if unreachable {
            set.insert(service);
        } else {
            set.remove(&service);
        }
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn check_reachable(&self, operation: &str, service: &Identity) -> MicoResult<()> {
        if self.unreachable.read().await.contains(service) {
            return Err(MicoError::OrchestrationFailed {
                operation: operation.to_string(),
                reason: format!("platform unreachable for service '{}'", service),
            });
        }

        Ok(())
    }

    async fn deployment(&self, operation: &str, service: &MicoService) -> MicoResult<ServiceFacts> {
        let identity = service.identity();
        self.check_reachable(operation, &identity).await?;

        self.services
            .read()
            .await
            .get(&identity)
            .filter(|f| f.deployed)
            .cloned()
            .ok_or_else(|| MicoError::OrchestrationFailed {
                operation: operation.to_string(),
                reason: format!("no deployment found for service '{}'", identity),
            })
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl OrchestrationClient for StaticClusterClient {
    async fn is_service_deployed(&self, service: &MicoService) -> MicoResult<bool> {
        self.delay().await;

        let identity = service.identity();
        self.check_reachable("is_service_deployed", &identity)
            .await?;

        Ok(self
            .services
            .read()
            .await
            .get(&identity)
            .is_some_and(|f| f.deployed))
    }

    async fn is_application_deployed(&self, application: &MicoApplication) -> MicoResult<bool> {
        self.delay().await;
        Ok(self
            .applications
            .read()
            .await
            .contains(&application.identity()))
    }

    async fn list_pods(&self, service: &MicoService) -> MicoResult<Vec<PodFacts>> {
        self.delay().await;
        Ok(self.deployment("list_pods", service).await?.pods)
    }

    async fn get_available_replicas(&self, service: &MicoService) -> MicoResult<u32> {
        self.delay().await;
        Ok(self
            .deployment("get_available_replicas", service)
            .await?
            .available_replicas)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Serde Defaults
//--------------------------------------------------------------------------------------------------

fn default_deployed() -> bool {
    true
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
