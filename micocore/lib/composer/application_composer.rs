use std::{sync::Arc, time::Duration};

use tokio::sync::RwLock;

use crate::{
    catalog::ServiceCatalog,
    models::{
        DeploymentInfoPatch, Identity, MicoApplication, MicoService, MicoServiceDeploymentInfo,
        VersionOrder,
    },
    orchestration::{with_timeout, OrchestrationClient},
    MicoError, MicoResult,
};

use super::{ApplicationStore, RecordCounts};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Maintains applications and the pairing of their services with deployment information.
///
/// Every mutation runs under the store's write lock and either commits both the service list and
/// the deployment info list or neither.
pub struct ApplicationComposer {
    store: RwLock<ApplicationStore>,
    catalog: Arc<ServiceCatalog>,
    orchestration: Arc<dyn OrchestrationClient>,
    timeout: Duration,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ApplicationComposer {
    /// Creates a composer without applications.
    pub fn new(
        catalog: Arc<ServiceCatalog>,
        orchestration: Arc<dyn OrchestrationClient>,
        timeout: Duration,
    ) -> Self {
        Self {
            store: RwLock::new(ApplicationStore::new()),
            catalog,
            orchestration,
            timeout,
        }
    }

    /// Returns the application with the given identity.
    pub async fn get_by_identity(
        &self,
        short_name: &str,
        version: &str,
    ) -> MicoResult<MicoApplication> {
        let identity = Identity::new(short_name, version);
        self.store
            .read()
            .await
            .get(&identity)
            .ok_or(MicoError::ApplicationNotFound(identity))
    }

    /// Returns every version of the application, oldest first.
    pub async fn get_all_versions(&self, short_name: &str) -> Vec<MicoApplication> {
        self.get_all_versions_ordered(short_name, VersionOrder::Ascending)
            .await
    }

    /// Returns every version of the application in the requested order.
    pub async fn get_all_versions_ordered(
        &self,
        short_name: &str,
        order: VersionOrder,
    ) -> Vec<MicoApplication> {
        let mut versions = self.store.read().await.versions(short_name);
        versions.sort_by(|a, b| order.compare(a.get_version(), b.get_version()));
        versions
    }

    /// Returns every application.
    pub async fn get_all(&self) -> Vec<MicoApplication> {
        self.store.read().await.all()
    }

    /// Stores a new application.
    ///
    /// Every referenced service must exist in the catalog. Services without deployment
    /// information on the payload get default deployment information.
    pub async fn create(&self, mut application: MicoApplication) -> MicoResult<MicoApplication> {
        for service in &application.services {
            if !self.catalog.exists(service).await {
                return Err(MicoError::ServiceNotFound(service.clone()));
            }
        }

        let missing: Vec<Identity> = application
            .services
            .iter()
            .filter(|s| {
                !application
                    .service_deployment_infos
                    .iter()
                    .any(|info| &info.service == *s)
            })
            .cloned()
            .collect();
        application.service_deployment_infos.extend(
            missing
                .into_iter()
                .map(MicoServiceDeploymentInfo::for_service),
        );

        let created = self.store.write().await.insert(application)?;

        tracing::info!(application = %created.identity(), "created application");
        Ok(created)
    }

    /// Replaces the name and the description of an application. Service references change only
    /// through [`ApplicationComposer::add_service`] and [`ApplicationComposer::remove_service`].
    pub async fn update(
        &self,
        short_name: &str,
        version: &str,
        new_values: MicoApplication,
    ) -> MicoResult<MicoApplication> {
        let expected = Identity::new(short_name, version);
        let actual = new_values.identity();
        if expected != actual {
            return Err(MicoError::IdentityMismatch { expected, actual });
        }

        let updated = self.store.write().await.update_attributes(
            &expected,
            new_values.name,
            new_values.description,
        )?;

        tracing::info!(application = %expected, "updated application");
        Ok(updated)
    }

    /// Deletes an application unless the platform reports it as deployed.
    pub async fn delete(&self, short_name: &str, version: &str) -> MicoResult<()> {
        let application = self.get_by_identity(short_name, version).await?;
        self.check_not_deployed(&application).await?;

        let identity = application.identity();
        let mut store = self.store.write().await;
        store
            .remove(&identity)
            .ok_or_else(|| MicoError::ApplicationNotFound(identity.clone()))?;
        store.clean_up_orphans();

        tracing::info!(application = %identity, "deleted application");
        Ok(())
    }

    /// Deletes every version of an application. If any version is deployed, nothing is deleted.
    pub async fn delete_all_versions(&self, short_name: &str) -> MicoResult<()> {
        let applications = self.get_all_versions(short_name).await;
        if applications.is_empty() {
            return Err(MicoError::ApplicationVersionsNotFound(
                short_name.to_string(),
            ));
        }

        for application in &applications {
            self.check_not_deployed(application).await?;
        }

        let mut store = self.store.write().await;
        for application in &applications {
            store.remove(&application.identity());
        }
        store.clean_up_orphans();

        tracing::info!(
            short_name,
            versions = applications.len(),
            "deleted all versions of application"
        );
        Ok(())
    }

    /// Copies an application under a new version.
    ///
    /// The copy references the same services and gets its own copy of every deployment info, so
    /// it can be configured independently of the source.
    pub async fn copy_and_upgrade(
        &self,
        short_name: &str,
        version: &str,
        new_version: &str,
    ) -> MicoResult<MicoApplication> {
        let source = Identity::new(short_name, version);

        let mut store = self.store.write().await;
        let mut copy = store
            .get(&source)
            .ok_or_else(|| MicoError::ApplicationNotFound(source.clone()))?;
        copy.id = None;
        copy.version = new_version.to_string();
        let copy = store.insert(copy)?;

        tracing::info!(application = %source, new_version, "promoted application");
        Ok(copy)
    }

    /// Adds a service to an application together with default deployment information. Adding a
    /// service that is already referenced is a no-op. Another version of a referenced short name
    /// replaces the old reference and its deployment information.
    pub async fn add_service(&self, application: &Identity, service: &Identity) -> MicoResult<()> {
        if !self.store.read().await.contains(application) {
            return Err(MicoError::ApplicationNotFound(application.clone()));
        }
        if !self.catalog.exists(service).await {
            return Err(MicoError::ServiceNotFound(service.clone()));
        }

        let mut store = self.store.write().await;
        if store.add_service(application, service.clone())? {
            store.clean_up_orphans();
            tracing::info!(application = %application, service = %service, "added service to application");
        } else {
            tracing::info!(application = %application, service = %service, "application already contains service");
        }

        Ok(())
    }

    /// Removes every reference to a service with the given short name together with its
    /// deployment information. Removing a service that is not referenced is a no-op.
    pub async fn remove_service(&self, application: &Identity, short_name: &str) -> MicoResult<()> {
        let mut store = self.store.write().await;
        if store.remove_service(application, short_name)? {
            store.clean_up_orphans();
            tracing::info!(application = %application, service = short_name, "removed service from application");
        } else {
            tracing::debug!(application = %application, service = short_name, "application does not include service");
        }

        Ok(())
    }

    /// Resolves the services of an application through the catalog, in application order.
    pub async fn get_services(&self, application: &Identity) -> MicoResult<Vec<MicoService>> {
        let references = self
            .store
            .read()
            .await
            .get(application)
            .ok_or_else(|| MicoError::ApplicationNotFound(application.clone()))?
            .services;

        let mut services = Vec::with_capacity(references.len());
        for reference in references {
            services.push(
                self.catalog
                    .get_by_identity(reference.get_short_name(), reference.get_version())
                    .await?,
            );
        }

        Ok(services)
    }

    /// Returns the deployment information of every service of an application, in application
    /// order.
    pub async fn get_deployment_infos(
        &self,
        application: &Identity,
    ) -> MicoResult<Vec<MicoServiceDeploymentInfo>> {
        self.store
            .read()
            .await
            .get(application)
            .map(|app| app.service_deployment_infos)
            .ok_or_else(|| MicoError::ApplicationNotFound(application.clone()))
    }

    /// Returns the deployment information of a service inside an application.
    pub async fn get_deployment_info(
        &self,
        application: &Identity,
        short_name: &str,
    ) -> MicoResult<MicoServiceDeploymentInfo> {
        self.store
            .read()
            .await
            .deployment_info(application, short_name)
    }

    /// Overwrites the provided fields of a service's deployment information.
    pub async fn update_deployment_info(
        &self,
        application: &Identity,
        short_name: &str,
        patch: DeploymentInfoPatch,
    ) -> MicoResult<MicoServiceDeploymentInfo> {
        let mut store = self.store.write().await;
        let info = store.update_deployment_info(application, short_name, patch)?;
        store.clean_up_orphans();

        tracing::debug!(application = %application, service = short_name, "updated deployment information");
        Ok(info)
    }

    /// Returns every application referencing the service.
    pub async fn get_applications_using_service(
        &self,
        service: &Identity,
    ) -> Vec<MicoApplication> {
        self.store.read().await.using_service(service)
    }

    /// Returns the number of stored records per table.
    pub async fn record_counts(&self) -> RecordCounts {
        self.store.read().await.record_counts()
    }

    async fn check_not_deployed(&self, application: &MicoApplication) -> MicoResult<()> {
        let deployed = with_timeout(
            self.timeout,
            "is_application_deployed",
            self.orchestration.is_application_deployed(application),
        )
        .await?;

        if deployed {
            tracing::warn!(application = %application.identity(), "application is deployed");
            return Err(MicoError::ApplicationIsDeployed(application.identity()));
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
