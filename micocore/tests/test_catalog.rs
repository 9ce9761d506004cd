use std::sync::Arc;

use micocore::{
    config::MicoConfig,
    management::MicoCore,
    models::{Identity, MicoService},
    orchestration::{ServiceFacts, StaticClusterClient},
    ErrorKind, MicoError,
};

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test)]
async fn test_catalog_delete_waits_for_dependency_removal() -> anyhow::Result<()> {
    let (core, _) = helper::setup()?;
    let catalog = core.get_catalog();
    let a = catalog.persist(helper::service("svc-a", "1.0")).await?;
    let b = catalog.persist(helper::service("svc-b", "1.0")).await?;

    catalog.add_dependency(&a.identity(), &b.identity()).await?;

    let err = catalog.delete("svc-b", "1.0").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HasDependers);

    catalog.remove_dependency(&a.identity(), &b.identity()).await?;
    catalog.delete("svc-b", "1.0").await?;

    assert!(!catalog.exists(&b.identity()).await);
    assert!(catalog.get_dependees(&a.identity()).await?.is_empty());

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_catalog_duplicate_dependency_is_rejected() -> anyhow::Result<()> {
    let (core, _) = helper::setup()?;
    let catalog = core.get_catalog();
    let a = catalog.persist(helper::service("svc-a", "1.0.0")).await?;
    let b = catalog.persist(helper::service("svc-b", "1.0.0")).await?;

    catalog.add_dependency(&a.identity(), &b.identity()).await?;
    let again = catalog.add_dependency(&a.identity(), &b.identity()).await;
    assert!(matches!(again, Err(MicoError::DependencyAlreadyExists { .. })));

    let dependers = catalog.get_dependers(&b.identity()).await?;
    assert_eq!(dependers.len(), 1);
    assert_eq!(dependers[0].identity(), a.identity());

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_catalog_concurrent_dependency_writers_add_one_edge() -> anyhow::Result<()> {
    let (core, _) = helper::setup()?;
    let catalog = Arc::clone(core.get_catalog());
    let a = catalog.persist(helper::service("svc-a", "1.0.0")).await?.identity();
    let b = catalog.persist(helper::service("svc-b", "1.0.0")).await?.identity();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let catalog = Arc::clone(&catalog);
            let (a, b) = (a.clone(), b.clone());
            tokio::spawn(async move { catalog.add_dependency(&a, &b).await })
        })
        .collect();

    let mut added = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => added += 1,
            Err(MicoError::DependencyAlreadyExists { .. }) => duplicates += 1,
            Err(e) => return Err(e.into()),
        }
    }

    assert_eq!(added, 1);
    assert_eq!(duplicates, 31);
    assert_eq!(catalog.get_dependees(&a).await?.len(), 1);
    assert_eq!(catalog.get_dependers(&b).await?.len(), 1);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_catalog_dependers_block_delete_of_deployed_service() -> anyhow::Result<()> {
    let (core, cluster) = helper::setup()?;
    let catalog = core.get_catalog();
    let a = catalog.persist(helper::service("svc-a", "1.0.0")).await?;
    let b = catalog.persist(helper::service("svc-b", "1.0.0")).await?;
    catalog.add_dependency(&a.identity(), &b.identity()).await?;

    cluster
        .set_service(ServiceFacts {
            service: b.identity(),
            deployed: true,
            available_replicas: 1,
            pods: vec![],
        })
        .await;

    let err = catalog.delete("svc-b", "1.0.0").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HasDependers);

    catalog.remove_dependency(&a.identity(), &b.identity()).await?;
    let err = catalog.delete("svc-b", "1.0.0").await.unwrap_err();
    assert!(matches!(err, MicoError::ServiceIsDeployed(_)));

    cluster.remove_service(&b.identity()).await;
    catalog.delete("svc-b", "1.0.0").await?;

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_catalog_promote_copies_fields_without_edges() -> anyhow::Result<()> {
    let (core, _) = helper::setup()?;
    let catalog = core.get_catalog();
    let a = catalog
        .persist(
            MicoService::builder()
                .short_name("svc-a")
                .version("1.0.0")
                .name("Service A")
                .description("the first service")
                .owner("team-a")
                .build(),
        )
        .await?;
    let b = catalog.persist(helper::service("svc-b", "1.0.0")).await?;
    catalog.add_dependency(&a.identity(), &b.identity()).await?;

    let promoted = catalog.promote("svc-a", "1.0.0", "1.1.0").await?;
    let fetched = catalog.get_by_identity("svc-a", "1.1.0").await?;

    assert_eq!(promoted, fetched);
    assert_eq!(fetched.get_name(), a.get_name());
    assert_eq!(fetched.get_description(), a.get_description());
    assert_eq!(fetched.get_owner(), a.get_owner());
    assert_ne!(fetched.get_id(), a.get_id());
    assert!(fetched.get_dependencies().is_empty());
    assert!(catalog.get_dependees(&fetched.identity()).await?.is_empty());
    assert_eq!(catalog.get_dependees(&a.identity()).await?.len(), 1);

    let versions: Vec<_> = catalog
        .get_all_versions("svc-a")
        .await
        .iter()
        .map(|s| s.get_version().clone())
        .collect();
    assert_eq!(versions, vec!["1.0.0", "1.1.0"]);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_catalog_reports_cycles_and_closures() -> anyhow::Result<()> {
    let (core, _) = helper::setup()?;
    let catalog = core.get_catalog();
    let a = catalog.persist(helper::service("svc-a", "1.0.0")).await?;
    let b = catalog.persist(helper::service("svc-b", "1.0.0")).await?;
    let c = catalog.persist(helper::service("svc-c", "1.0.0")).await?;

    catalog.add_dependency(&a.identity(), &b.identity()).await?;
    catalog.add_dependency(&b.identity(), &c.identity()).await?;
    assert!(catalog.find_dependency_cycle().await.is_none());

    let closure: Vec<Identity> = catalog
        .get_dependency_closure(&a.identity())
        .await?
        .iter()
        .map(MicoService::identity)
        .collect();
    assert_eq!(closure, vec![b.identity(), c.identity()]);

    catalog.add_dependency(&c.identity(), &a.identity()).await?;
    let cycle = catalog.find_dependency_cycle().await;
    assert_eq!(cycle.map(|c| c.len()), Some(3));

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Helpers
//--------------------------------------------------------------------------------------------------

mod helper {
    use super::*;

    pub(super) fn setup() -> anyhow::Result<(MicoCore, Arc<StaticClusterClient>)> {
        let cluster = Arc::new(StaticClusterClient::default());
        let core = MicoCore::new(MicoConfig::default(), cluster.clone())?;
        Ok((core, cluster))
    }

    pub(super) fn service(short_name: &str, version: &str) -> MicoService {
        MicoService::builder()
            .short_name(short_name)
            .version(version)
            .name(short_name)
            .build()
    }
}
