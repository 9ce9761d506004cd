use std::{sync::Arc, time::Duration};

use futures::future;

use crate::{
    catalog::ServiceCatalog,
    composer::ApplicationComposer,
    jobs::BackgroundJobTracker,
    models::{
        ApplicationStatus, DeploymentStatus, Identity, MicoService, PodInformation,
        ServiceInterfaceStatus, ServiceStatus,
    },
    orchestration::{with_timeout, OrchestrationClient},
    MicoResult,
};

use super::aggregate_node_metrics;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Computes point-in-time status snapshots.
///
/// The reconciler only reads from the catalog, the composer and the job tracker and holds no
/// lock while it waits on the orchestration platform, so any number of reconciliations can run
/// at once. Platform failures and timeouts end up in the snapshot's `error_messages`; they never
/// fail the call.
pub struct StatusReconciler {
    catalog: Arc<ServiceCatalog>,
    composer: Arc<ApplicationComposer>,
    jobs: Arc<BackgroundJobTracker>,
    orchestration: Arc<dyn OrchestrationClient>,
    default_replicas: u32,
    timeout: Duration,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StatusReconciler {
    /// Creates a new reconciler.
    pub fn new(
        catalog: Arc<ServiceCatalog>,
        composer: Arc<ApplicationComposer>,
        jobs: Arc<BackgroundJobTracker>,
        orchestration: Arc<dyn OrchestrationClient>,
        default_replicas: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            composer,
            jobs,
            orchestration,
            default_replicas,
            timeout,
        }
    }

    /// Returns the status of a service outside of any application, requesting the default number
    /// of replicas.
    ///
    /// Fails only if the service does not exist.
    pub async fn service_status(&self, short_name: &str, version: &str) -> MicoResult<ServiceStatus> {
        let service = self.catalog.get_by_identity(short_name, version).await?;
        Ok(self.reconcile_service(&service, self.default_replicas).await)
    }

    /// Returns the status of an application and of each of its services.
    ///
    /// Fails only if the application does not exist. A referenced service missing from the
    /// catalog yields a service status carrying the error.
    pub async fn application_status(
        &self,
        short_name: &str,
        version: &str,
    ) -> MicoResult<ApplicationStatus> {
        let application = self.composer.get_by_identity(short_name, version).await?;

        let deployed = with_timeout(
            self.timeout,
            "is_application_deployed",
            self.orchestration.is_application_deployed(&application),
        );

        let services = future::join_all(application.get_services().iter().map(|reference| {
            let requested = application
                .deployment_info_for(reference.get_short_name())
                .map(|info| info.replicas_or(self.default_replicas))
                .unwrap_or(self.default_replicas);
            self.reconcile_reference(reference, requested)
        }));

        let (deployed, service_statuses) = tokio::join!(deployed, services);

        let mut status = ApplicationStatus {
            short_name: short_name.to_string(),
            version: version.to_string(),
            ..Default::default()
        };

        match deployed {
            Ok(true) => status.deployment_status = DeploymentStatus::Deployed,
            Ok(false) => status.deployment_status = DeploymentStatus::NotDeployed,
            Err(e) => {
                tracing::warn!(application = %application.identity(), error = %e, "could not determine deployment status");
                status
                    .error_messages
                    .push(format!("could not determine deployment status: {}", e));
            }
        }

        status.total_requested_replicas = service_statuses.iter().map(|s| s.requested_replicas).sum();
        status.total_available_replicas = service_statuses.iter().map(|s| s.available_replicas).sum();
        status.total_pods = service_statuses.iter().map(|s| s.pods.len()).sum();
        status.service_statuses = service_statuses;

        Ok(status)
    }

    async fn reconcile_reference(&self, reference: &Identity, requested: u32) -> ServiceStatus {
        match self
            .catalog
            .get_by_identity(reference.get_short_name(), reference.get_version())
            .await
        {
            Ok(service) => self.reconcile_service(&service, requested).await,
            Err(e) => {
                tracing::warn!(service = %reference, error = %e, "referenced service is missing");
                ServiceStatus {
                    short_name: reference.get_short_name().clone(),
                    version: reference.get_version().clone(),
                    requested_replicas: requested,
                    error_messages: vec![e.to_string()],
                    ..Default::default()
                }
            }
        }
    }

    async fn reconcile_service(&self, service: &MicoService, requested: u32) -> ServiceStatus {
        let identity = service.identity();

        let (pods, available, in_flight_jobs) = tokio::join!(
            with_timeout(self.timeout, "list_pods", self.orchestration.list_pods(service)),
            with_timeout(
                self.timeout,
                "get_available_replicas",
                self.orchestration.get_available_replicas(service),
            ),
            self.jobs
                .list_in_flight(service.get_short_name(), service.get_version()),
        );

        let mut error_messages = Vec::new();

        let pods: Vec<PodInformation> = match pods {
            Ok(pods) => pods.into_iter().map(PodInformation::from).collect(),
            Err(e) => {
                tracing::warn!(service = %identity, error = %e, "could not list pods");
                error_messages.push(format!("could not list pods: {}", e));
                Vec::new()
            }
        };

        let available_replicas = match available {
            Ok(available) => available,
            Err(e) => {
                tracing::warn!(service = %identity, error = %e, "could not get available replicas");
                error_messages.push(format!("could not get available replicas: {}", e));
                0
            }
        };

        ServiceStatus {
            name: service.get_name().clone(),
            short_name: service.get_short_name().clone(),
            version: service.get_version().clone(),
            requested_replicas: requested,
            available_replicas,
            interfaces: service
                .get_service_interfaces()
                .iter()
                .map(|i| ServiceInterfaceStatus {
                    name: i.get_service_interface_name().clone(),
                })
                .collect(),
            node_metrics: aggregate_node_metrics(&pods),
            pods,
            in_flight_jobs,
            error_messages,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
