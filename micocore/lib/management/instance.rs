use std::sync::Arc;

use getset::Getters;

use crate::{
    catalog::ServiceCatalog,
    composer::ApplicationComposer,
    config::MicoConfig,
    jobs::BackgroundJobTracker,
    orchestration::OrchestrationClient,
    status::StatusReconciler,
    MicoResult,
};

use super::CatalogSnapshot;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The catalog, the composer, the job tracker and the status reconciler wired to one
/// orchestration client and one configuration.
#[derive(Getters)]
#[getset(get = "pub with_prefix")]
pub struct MicoCore {
    /// The settings the components were built with.
    config: MicoConfig,

    /// The service catalog.
    catalog: Arc<ServiceCatalog>,

    /// The application composer.
    composer: Arc<ApplicationComposer>,

    /// The background job tracker.
    jobs: Arc<BackgroundJobTracker>,

    /// The status reconciler.
    reconciler: StatusReconciler,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MicoCore {
    /// Builds an empty core.
    pub fn new(config: MicoConfig, orchestration: Arc<dyn OrchestrationClient>) -> MicoResult<Self> {
        config.validate()?;

        let timeout = config.orchestration_timeout();
        let catalog = Arc::new(ServiceCatalog::new(orchestration.clone(), timeout));
        let composer = Arc::new(ApplicationComposer::new(
            catalog.clone(),
            orchestration.clone(),
            timeout,
        ));
        let jobs = Arc::new(BackgroundJobTracker::new(config.get_job_history_limit()));
        let reconciler = StatusReconciler::new(
            catalog.clone(),
            composer.clone(),
            jobs.clone(),
            orchestration,
            config.get_default_replicas(),
            timeout,
        );

        Ok(Self {
            config,
            catalog,
            composer,
            jobs,
            reconciler,
        })
    }

    /// Captures every service and application.
    pub async fn export_snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            services: self.catalog.get_all().await,
            applications: self.composer.get_all().await,
        }
    }

    /// Stores everything in the snapshot: services first, then their dependency edges, then
    /// applications. Fails on the first identity collision.
    pub async fn import_snapshot(&self, snapshot: CatalogSnapshot) -> MicoResult<()> {
        let mut edges = Vec::new();
        for mut service in snapshot.services {
            edges.append(&mut service.dependencies);
            self.catalog.persist(service).await?;
        }

        for edge in edges {
            self.catalog
                .add_dependency_with_range(&edge.service, &edge.depended_service, edge.version_range)
                .await?;
        }

        for application in snapshot.applications {
            self.composer.create(application).await?;
        }

        tracing::info!("imported catalog snapshot");
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Identity, MicoApplication, MicoService},
        orchestration::StaticClusterClient,
        MicoError,
    };

    fn core() -> anyhow::Result<MicoCore> {
        Ok(MicoCore::new(
            MicoConfig::default(),
            Arc::new(StaticClusterClient::default()),
        )?)
    }

    fn service(short_name: &str) -> MicoService {
        MicoService::builder()
            .short_name(short_name)
            .version("1.0.0")
            .name(short_name)
            .build()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = MicoCore::new(
            MicoConfig::builder().default_replicas(0).build(),
            Arc::new(StaticClusterClient::default()),
        );
        assert!(matches!(result, Err(MicoError::ConfigValidation(_))));
    }

    #[test_log::test(tokio::test)]
    async fn test_snapshot_survives_save_and_import() -> anyhow::Result<()> {
        let source = core()?;
        let a = source.get_catalog().persist(service("svc-a")).await?;
        let b = source.get_catalog().persist(service("svc-b")).await?;
        source
            .get_catalog()
            .add_dependency(&a.identity(), &b.identity())
            .await?;
        source
            .get_composer()
            .create(
                MicoApplication::builder()
                    .short_name("app")
                    .version("1.0.0")
                    .name("App")
                    .services(vec![a.identity()])
                    .build(),
            )
            .await?;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("catalog.json");
        source.export_snapshot().await.save(&path).await?;

        let target = core()?;
        target.import_snapshot(CatalogSnapshot::load(&path).await?).await?;

        let dependers = target.get_catalog().get_dependers(&b.identity()).await?;
        assert_eq!(dependers.len(), 1);
        assert_eq!(dependers[0].identity(), a.identity());

        let app = target.get_composer().get_by_identity("app", "1.0.0").await?;
        assert_eq!(app.get_services(), &vec![Identity::new("svc-a", "1.0.0")]);
        assert_eq!(app.get_service_deployment_infos().len(), 1);

        let again = target.import_snapshot(source.export_snapshot().await).await;
        assert!(matches!(again, Err(MicoError::ServiceAlreadyExists(_))));

        Ok(())
    }
}
