use std::sync::Arc;

use micocore::{
    config::MicoConfig,
    management::MicoCore,
    models::{
        DeploymentInfoPatch, DeploymentStatus, Identity, JobKey, JobType, MicoApplication,
        MicoService, Patch, PodPhase,
    },
    orchestration::{PodFacts, ServiceFacts, StaticClusterClient},
    MicoError,
};

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test)]
async fn test_status_averages_pod_metrics_per_node() -> anyhow::Result<()> {
    let (core, cluster) = helper::setup(MicoConfig::default())?;
    let svc = helper::persist_service(&core, "svc-a").await?;
    let app = core
        .get_composer()
        .create(
            MicoApplication::builder()
                .short_name("app")
                .version("1.0")
                .name("App")
                .services(vec![svc.clone()])
                .build(),
        )
        .await?;
    core.get_composer()
        .update_deployment_info(
            &app.identity(),
            "svc-a",
            DeploymentInfoPatch {
                replicas: Patch::Set(Some(2)),
                ..Default::default()
            },
        )
        .await?;

    cluster
        .set_service(ServiceFacts {
            service: svc.clone(),
            deployed: true,
            available_replicas: 1,
            pods: vec![
                helper::pod("svc-a-1", "n1", 10.0, 50.0),
                helper::pod("svc-a-2", "n1", 40.0, 70.0),
            ],
        })
        .await;

    let status = core.get_reconciler().application_status("app", "1.0").await?;
    let service = &status.service_statuses[0];

    assert_eq!(service.requested_replicas, 2);
    assert_eq!(service.available_replicas, 1);
    assert_eq!(service.pods.len(), 2);
    assert_eq!(service.node_metrics.len(), 1);
    assert_eq!(service.node_metrics[0].node_name, "n1");
    assert_eq!(service.node_metrics[0].average_cpu_load, 25.0);
    assert_eq!(service.node_metrics[0].average_memory_usage, 60.0);
    assert!(!service.has_errors());
    assert_eq!(status.deployment_status, DeploymentStatus::NotDeployed);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_status_service_uses_configured_default_replicas() -> anyhow::Result<()> {
    let (core, cluster) = helper::setup(MicoConfig::builder().default_replicas(3).build())?;
    let svc = helper::persist_service(&core, "svc-a").await?;
    cluster
        .set_service(ServiceFacts {
            service: svc.clone(),
            deployed: true,
            available_replicas: 3,
            pods: vec![],
        })
        .await;
    core.get_jobs()
        .submit(JobKey::new(svc.clone(), JobType::Build))
        .await;

    let status = core.get_reconciler().service_status("svc-a", "1.0").await?;

    assert_eq!(status.requested_replicas, 3);
    assert_eq!(status.available_replicas, 3);
    assert_eq!(status.in_flight_jobs.len(), 1);
    assert!(status.node_metrics.is_empty());

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_status_unknown_application_fails() -> anyhow::Result<()> {
    let (core, _) = helper::setup(MicoConfig::default())?;

    let result = core.get_reconciler().application_status("app", "1.0").await;
    assert!(matches!(result, Err(MicoError::ApplicationNotFound(_))));

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Helpers
//--------------------------------------------------------------------------------------------------

mod helper {
    use super::*;

    pub(super) fn setup(
        config: MicoConfig,
    ) -> anyhow::Result<(MicoCore, Arc<StaticClusterClient>)> {
        let cluster = Arc::new(StaticClusterClient::default());
        let core = MicoCore::new(config, cluster.clone())?;
        Ok((core, cluster))
    }

    pub(super) async fn persist_service(
        core: &MicoCore,
        short_name: &str,
    ) -> anyhow::Result<Identity> {
        let service = core
            .get_catalog()
            .persist(
                MicoService::builder()
                    .short_name(short_name)
                    .version("1.0")
                    .name(short_name)
                    .build(),
            )
            .await?;
        Ok(service.identity())
    }

    pub(super) fn pod(name: &str, node: &str, cpu_load: f64, memory_usage: f64) -> PodFacts {
        PodFacts {
            pod_name: name.to_string(),
            host_node: node.to_string(),
            phase: PodPhase::Running,
            cpu_load,
            memory_usage,
        }
    }
}
