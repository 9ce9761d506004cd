use std::{collections::HashSet, sync::Arc, time::Duration};

use semver::VersionReq;
use tokio::sync::RwLock;

use crate::{
    models::{Identity, MicoService, VersionOrder},
    orchestration::{with_timeout, OrchestrationClient},
    MicoError, MicoResult,
};

use super::ServiceGraph;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The store of services and their dependency edges.
///
/// All mutations take the graph's write lock for the whole read-modify-write, so two writers can
/// never both pass the same existence check. Orchestration calls are made without holding the
/// lock.
pub struct ServiceCatalog {
    graph: RwLock<ServiceGraph>,
    orchestration: Arc<dyn OrchestrationClient>,
    timeout: Duration,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServiceCatalog {
    /// Creates an empty catalog.
    pub fn new(orchestration: Arc<dyn OrchestrationClient>, timeout: Duration) -> Self {
        Self {
            graph: RwLock::new(ServiceGraph::new()),
            orchestration,
            timeout,
        }
    }

    /// Returns the service with the given identity.
    pub async fn get_by_identity(&self, short_name: &str, version: &str) -> MicoResult<MicoService> {
        let identity = Identity::new(short_name, version);
        self.graph
            .read()
            .await
            .get(&identity)
            .ok_or(MicoError::ServiceNotFound(identity))
    }

    /// Whether a service with the identity exists.
    pub async fn exists(&self, identity: &Identity) -> bool {
        self.graph.read().await.contains(identity)
    }

    /// Returns every version of the service, oldest first.
    pub async fn get_all_versions(&self, short_name: &str) -> Vec<MicoService> {
        self.get_all_versions_ordered(short_name, VersionOrder::Ascending)
            .await
    }

    /// Returns every version of the service in the requested order.
    pub async fn get_all_versions_ordered(
        &self,
        short_name: &str,
        order: VersionOrder,
    ) -> Vec<MicoService> {
        let mut versions = self.graph.read().await.versions(short_name);
        versions.sort_by(|a, b| order.compare(a.get_version(), b.get_version()));
        versions
    }

    /// Returns every service, ordered by short name and then by version.
    pub async fn get_all(&self) -> Vec<MicoService> {
        let mut services = self.graph.read().await.all();
        services.sort_by(|a, b| {
            a.get_short_name()
                .cmp(b.get_short_name())
                .then_with(|| VersionOrder::Ascending.compare(a.get_version(), b.get_version()))
        });
        services
    }

    /// Stores a new service.
    ///
    /// Dependencies listed on the payload become edges. Either the service and all its edges are
    /// stored or nothing is.
    pub async fn persist(&self, service: MicoService) -> MicoResult<MicoService> {
        let identity = service.identity();
        let dependencies = service.dependencies.clone();

        let mut graph = self.graph.write().await;
        graph.insert(service)?;

        for dependency in dependencies {
            if let Err(e) = graph.add_edge(
                &identity,
                &dependency.depended_service,
                dependency.version_range,
            ) {
                graph.remove(&identity);
                tracing::warn!(service = %identity, error = %e, "rejected service");
                return Err(e);
            }
        }

        tracing::info!(service = %identity, "persisted service");
        graph
            .get(&identity)
            .ok_or(MicoError::ServiceNotFound(identity))
    }

    /// Replaces every non-identity attribute of a service. Dependency edges are kept.
    pub async fn update(
        &self,
        short_name: &str,
        version: &str,
        new_values: MicoService,
    ) -> MicoResult<MicoService> {
        let expected = Identity::new(short_name, version);
        let actual = new_values.identity();
        if expected != actual {
            return Err(MicoError::IdentityMismatch { expected, actual });
        }

        let mut graph = self.graph.write().await;
        let stored = graph
            .get_mut(&expected)
            .ok_or_else(|| MicoError::ServiceNotFound(expected.clone()))?;
        stored.replace_attributes(new_values);

        tracing::info!(service = %expected, "updated service");
        graph
            .get(&expected)
            .ok_or(MicoError::ServiceNotFound(expected))
    }

    /// Deletes a service and its outgoing edges.
    ///
    /// Fails with [`MicoError::HasDependers`] while any edge targets the service and with
    /// [`MicoError::ServiceIsDeployed`] while the platform reports it as deployed.
    pub async fn delete(&self, short_name: &str, version: &str) -> MicoResult<()> {
        let service = self.get_by_identity(short_name, version).await?;
        let identity = service.identity();

        self.check_no_dependers(&identity, &HashSet::new()).await?;
        self.check_not_deployed(&service).await?;

        let mut graph = self.graph.write().await;
        if !graph.contains(&identity) {
            return Err(MicoError::ServiceNotFound(identity));
        }
        Self::ensure_no_dependers(&graph, &identity, &HashSet::new())?;
        graph.remove(&identity);

        tracing::info!(service = %identity, "deleted service");
        Ok(())
    }

    /// Deletes every version of a service.
    ///
    /// Each version must pass the same checks as [`ServiceCatalog::delete`]; dependers that are
    /// themselves part of the batch do not count. If any version fails, nothing is deleted.
    pub async fn delete_all_versions(&self, short_name: &str) -> MicoResult<()> {
        let services = self.get_all_versions(short_name).await;
        if services.is_empty() {
            return Err(MicoError::ServiceVersionsNotFound(short_name.to_string()));
        }

        let batch: HashSet<Identity> = services.iter().map(MicoService::identity).collect();
        for service in &services {
            self.check_no_dependers(&service.identity(), &batch).await?;
        }
        for service in &services {
            self.check_not_deployed(service).await?;
        }

        let mut graph = self.graph.write().await;
        for identity in &batch {
            Self::ensure_no_dependers(&graph, identity, &batch)?;
        }
        for identity in &batch {
            graph.remove(identity);
        }

        tracing::info!(
            short_name,
            versions = batch.len(),
            "deleted all versions of service"
        );
        Ok(())
    }

    /// Copies a service under a new version. The copy starts without dependency edges.
    pub async fn promote(
        &self,
        short_name: &str,
        version: &str,
        new_version: &str,
    ) -> MicoResult<MicoService> {
        let source = Identity::new(short_name, version);

        let mut graph = self.graph.write().await;
        let service = graph
            .get(&source)
            .ok_or_else(|| MicoError::ServiceNotFound(source.clone()))?;
        let promoted = graph.insert(service.promoted(new_version))?;

        tracing::info!(service = %source, new_version, "promoted service");
        Ok(promoted)
    }

    /// Adds the edge `source -> target`.
    pub async fn add_dependency(&self, source: &Identity, target: &Identity) -> MicoResult<()> {
        self.add_dependency_with_range(source, target, None).await
    }

    /// Adds the edge `source -> target`, constraining the acceptable versions of the target.
    pub async fn add_dependency_with_range(
        &self,
        source: &Identity,
        target: &Identity,
        version_range: Option<VersionReq>,
    ) -> MicoResult<()> {
        self.graph
            .write()
            .await
            .add_edge(source, target, version_range)
            .inspect_err(|e| {
                tracing::warn!(service = %source, depended_service = %target, error = %e, "rejected dependency")
            })?;

        tracing::info!(service = %source, depended_service = %target, "added dependency");
        Ok(())
    }

    /// Removes the edge `source -> target`. Removing an edge that does not exist is a no-op.
    pub async fn remove_dependency(&self, source: &Identity, target: &Identity) -> MicoResult<()> {
        let mut graph = self.graph.write().await;
        for identity in [source, target] {
            if !graph.contains(identity) {
                return Err(MicoError::ServiceNotFound(identity.clone()));
            }
        }

        if graph.remove_edge(source, target) {
            tracing::info!(service = %source, depended_service = %target, "removed dependency");
        } else {
            tracing::debug!(service = %source, depended_service = %target, "no dependency to remove");
        }

        Ok(())
    }

    /// Returns every service with an edge into `identity`.
    pub async fn get_dependers(&self, identity: &Identity) -> MicoResult<Vec<MicoService>> {
        let graph = self.graph.read().await;
        if !graph.contains(identity) {
            return Err(MicoError::ServiceNotFound(identity.clone()));
        }

        Ok(graph
            .dependers(identity)
            .iter()
            .filter_map(|i| graph.get(i))
            .collect())
    }

    /// Returns every service `identity` has an edge into.
    pub async fn get_dependees(&self, identity: &Identity) -> MicoResult<Vec<MicoService>> {
        let graph = self.graph.read().await;
        if !graph.contains(identity) {
            return Err(MicoError::ServiceNotFound(identity.clone()));
        }

        Ok(graph
            .dependees(identity)
            .iter()
            .filter_map(|i| graph.get(i))
            .collect())
    }

    /// Returns every transitive dependee of `identity`, nearest first.
    pub async fn get_dependency_closure(&self, identity: &Identity) -> MicoResult<Vec<MicoService>> {
        let graph = self.graph.read().await;
        if !graph.contains(identity) {
            return Err(MicoError::ServiceNotFound(identity.clone()));
        }

        Ok(graph
            .closure(identity)
            .iter()
            .filter_map(|i| graph.get(i))
            .collect())
    }

    /// Returns one dependency cycle, if any exists.
    pub async fn find_dependency_cycle(&self) -> Option<Vec<Identity>> {
        self.graph.read().await.find_cycle()
    }

    async fn check_no_dependers(
        &self,
        identity: &Identity,
        ignored: &HashSet<Identity>,
    ) -> MicoResult<()> {
        let graph = self.graph.read().await;
        Self::ensure_no_dependers(&graph, identity, ignored)
    }

    fn ensure_no_dependers(
        graph: &ServiceGraph,
        identity: &Identity,
        ignored: &HashSet<Identity>,
    ) -> MicoResult<()> {
        let dependers: Vec<Identity> = graph
            .dependers(identity)
            .into_iter()
            .filter(|d| !ignored.contains(d))
            .collect();

        if !dependers.is_empty() {
            tracing::warn!(service = %identity, dependers = dependers.len(), "service still has dependers");
            return Err(MicoError::HasDependers {
                service: identity.clone(),
                dependers,
            });
        }

        Ok(())
    }

    async fn check_not_deployed(&self, service: &MicoService) -> MicoResult<()> {
        let deployed = with_timeout(
            self.timeout,
            "is_service_deployed",
            self.orchestration.is_service_deployed(service),
        )
        .await?;

        if deployed {
            tracing::warn!(service = %service.identity(), "service is deployed");
            return Err(MicoError::ServiceIsDeployed(service.identity()));
        }

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
        models::MicoServiceDependency,
        orchestration::{ServiceFacts, StaticClusterClient},
    };

    fn service(short_name: &str, version: &str) -> MicoService {
        MicoService::builder()
            .short_name(short_name)
            .version(version)
            .name(format!("Service {}", short_name))
            .build()
    }

    fn catalog() -> (ServiceCatalog, Arc<StaticClusterClient>) {
        let cluster = Arc::new(StaticClusterClient::default());
        let catalog = ServiceCatalog::new(cluster.clone(), Duration::from_secs(1));
        (catalog, cluster)
    }

    #[test_log::test(tokio::test)]
    async fn test_get_all_versions_orders_by_semver() -> anyhow::Result<()> {
        let (catalog, _) = catalog();
        for version in ["1.10.0", "1.2.0", "v1.9.0", "nightly"] {
            catalog.persist(service("svc-a", version)).await?;
        }
        catalog.persist(service("svc-b", "1.0.0")).await?;

        let versions: Vec<String> = catalog
            .get_all_versions("svc-a")
            .await
            .iter()
            .map(|s| s.get_version().clone())
            .collect();
        assert_eq!(versions, vec!["1.2.0", "v1.9.0", "1.10.0", "nightly"]);

        let newest = catalog
            .get_all_versions_ordered("svc-a", VersionOrder::Descending)
            .await;
        assert_eq!(newest[0].get_version(), "nightly");
        assert!(catalog.get_all_versions("unknown").await.is_empty());

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_persist_with_dependencies_is_all_or_nothing() -> anyhow::Result<()> {
        let (catalog, _) = catalog();
        catalog.persist(service("svc-b", "1.0.0")).await?;

        let mut payload = service("svc-a", "1.0.0");
        payload.dependencies = vec![
            MicoServiceDependency::new(payload.identity(), Identity::new("svc-b", "1.0.0")),
            MicoServiceDependency::new(payload.identity(), Identity::new("svc-x", "1.0.0")),
        ];

        let result = catalog.persist(payload.clone()).await;
        assert!(matches!(result, Err(MicoError::ServiceNotFound(_))));
        assert!(!catalog.exists(&payload.identity()).await);
        assert!(catalog
            .get_dependers(&Identity::new("svc-b", "1.0.0"))
            .await?
            .is_empty());

        payload.dependencies.pop();
        let stored = catalog.persist(payload).await?;
        assert_eq!(stored.get_dependencies().len(), 1);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_update_keeps_identity_and_edges() -> anyhow::Result<()> {
        let (catalog, _) = catalog();
        catalog.persist(service("svc-a", "1.0.0")).await?;
        catalog.persist(service("svc-b", "1.0.0")).await?;
        let a = Identity::new("svc-a", "1.0.0");
        catalog
            .add_dependency(&a, &Identity::new("svc-b", "1.0.0"))
            .await?;

        let mismatch = catalog
            .update("svc-a", "1.0.0", service("svc-a", "2.0.0"))
            .await;
        assert!(matches!(mismatch, Err(MicoError::IdentityMismatch { .. })));

        let missing = catalog
            .update("svc-c", "1.0.0", service("svc-c", "1.0.0"))
            .await;
        assert!(matches!(missing, Err(MicoError::ServiceNotFound(_))));

        let mut new_values = service("svc-a", "1.0.0");
        new_values.name = "Renamed".to_string();
        let updated = catalog.update("svc-a", "1.0.0", new_values).await?;

        assert_eq!(updated.get_name(), "Renamed");
        assert_eq!(updated.get_dependencies().len(), 1);
        assert_eq!(updated.get_id(), &Some(1));

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_is_blocked_by_deployment() -> anyhow::Result<()> {
        let (catalog, cluster) = catalog();
        let svc = catalog.persist(service("svc-a", "1.0.0")).await?;
        cluster
            .set_service(ServiceFacts {
                service: svc.identity(),
                deployed: true,
                available_replicas: 1,
                pods: Vec::new(),
            })
            .await;

        let result = catalog.delete("svc-a", "1.0.0").await;
        assert!(matches!(result, Err(MicoError::ServiceIsDeployed(_))));

        cluster.remove_service(&svc.identity()).await;
        catalog.delete("svc-a", "1.0.0").await?;
        assert!(matches!(
            catalog.delete("svc-a", "1.0.0").await,
            Err(MicoError::ServiceNotFound(_))
        ));

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_all_versions_ignores_dependers_inside_the_batch() -> anyhow::Result<()> {
        let (catalog, _) = catalog();
        catalog.persist(service("svc-a", "1.0.0")).await?;
        catalog.persist(service("svc-a", "2.0.0")).await?;
        catalog.persist(service("svc-c", "1.0.0")).await?;
        catalog
            .add_dependency(
                &Identity::new("svc-a", "2.0.0"),
                &Identity::new("svc-a", "1.0.0"),
            )
            .await?;
        catalog
            .add_dependency(
                &Identity::new("svc-c", "1.0.0"),
                &Identity::new("svc-a", "2.0.0"),
            )
            .await?;

        let blocked = catalog.delete_all_versions("svc-a").await;
        assert!(matches!(blocked, Err(MicoError::HasDependers { .. })));
        assert_eq!(catalog.get_all_versions("svc-a").await.len(), 2);

        catalog
            .remove_dependency(
                &Identity::new("svc-c", "1.0.0"),
                &Identity::new("svc-a", "2.0.0"),
            )
            .await?;
        catalog.delete_all_versions("svc-a").await?;

        assert!(catalog.get_all_versions("svc-a").await.is_empty());
        assert!(matches!(
            catalog.delete_all_versions("svc-a").await,
            Err(MicoError::ServiceVersionsNotFound(_))
        ));

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_promote_rejects_existing_version() -> anyhow::Result<()> {
        let (catalog, _) = catalog();
        catalog.persist(service("svc-a", "1.0.0")).await?;
        catalog.persist(service("svc-a", "1.1.0")).await?;

        assert!(matches!(
            catalog.promote("svc-a", "1.0.0", "1.1.0").await,
            Err(MicoError::ServiceAlreadyExists(_))
        ));
        assert!(matches!(
            catalog.promote("svc-x", "1.0.0", "1.1.0").await,
            Err(MicoError::ServiceNotFound(_))
        ));

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_remove_missing_dependency_is_noop() -> anyhow::Result<()> {
        let (catalog, _) = catalog();
        catalog.persist(service("svc-a", "1.0.0")).await?;
        catalog.persist(service("svc-b", "1.0.0")).await?;

        catalog
            .remove_dependency(
                &Identity::new("svc-a", "1.0.0"),
                &Identity::new("svc-b", "1.0.0"),
            )
            .await?;

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_closure_and_cycle_queries() -> anyhow::Result<()> {
        let (catalog, _) = catalog();
        for name in ["a", "b", "c"] {
            catalog.persist(service(name, "1.0.0")).await?;
        }
        let (a, b, c) = (
            Identity::new("a", "1.0.0"),
            Identity::new("b", "1.0.0"),
            Identity::new("c", "1.0.0"),
        );
        catalog.add_dependency(&a, &b).await?;
        catalog.add_dependency(&b, &c).await?;

        let closure: Vec<Identity> = catalog
            .get_dependency_closure(&a)
            .await?
            .iter()
            .map(MicoService::identity)
            .collect();
        assert_eq!(closure, vec![b.clone(), c.clone()]);
        assert_eq!(catalog.find_dependency_cycle().await, None);

        catalog.add_dependency(&c, &a).await?;
        assert!(catalog.find_dependency_cycle().await.is_some());

        Ok(())
    }
}
