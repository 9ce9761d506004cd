use std::sync::Arc;

use clap::{CommandFactory, Parser};
use micocore::{
    cli::{MicoArgs, MicoSubcommand},
    composer,
    config::MicoConfig,
    management::{CatalogSnapshot, MicoCore},
    models::Identity,
    orchestration::StaticClusterClient,
    utils, MicoError, MicoResult,
};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> MicoResult<()> {
    // Initialize tracing subscriber with EnvFilter
    fmt()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args = MicoArgs::parse();
    let Some(subcommand) = args.subcommand else {
        MicoArgs::command().print_help()?;
        return Ok(());
    };

    let home = args.home.unwrap_or_else(utils::mico_home);
    let config_path = args.config.unwrap_or_else(|| utils::config_path(&home));
    let snapshot_path = args.snapshot.unwrap_or_else(|| utils::snapshot_path(&home));

    let cluster = match args.cluster {
        Some(path) => StaticClusterClient::from_file(path).await?,
        None => StaticClusterClient::default(),
    };

    let core = MicoCore::new(
        MicoConfig::load_or_default(&config_path).await?,
        Arc::new(cluster),
    )?;

    if tokio::fs::try_exists(&snapshot_path).await? {
        core.import_snapshot(CatalogSnapshot::load(&snapshot_path).await?)
            .await?;
    }

    match subcommand {
        MicoSubcommand::Services { short_name } => {
            let services = match short_name {
                Some(short_name) => core.get_catalog().get_all_versions(&short_name).await,
                None => core.get_catalog().get_all().await,
            };
            print(&services)?;
        }
        MicoSubcommand::Dependers {
            short_name,
            version,
        } => {
            let identity = Identity::new(short_name, version);
            print(&core.get_catalog().get_dependers(&identity).await?)?;
        }
        MicoSubcommand::Closure {
            short_name,
            version,
        } => {
            let identity = Identity::new(short_name, version);
            print(&core.get_catalog().get_dependency_closure(&identity).await?)?;
        }
        MicoSubcommand::Check => {
            let cycle = core.get_catalog().find_dependency_cycle().await;
            let inconsistencies: Vec<String> = core
                .get_composer()
                .get_all()
                .await
                .iter()
                .filter_map(|application| composer::check_consistency(application).err())
                .map(|e| e.to_string())
                .collect();

            let healthy = cycle.is_none() && inconsistencies.is_empty();
            print(&serde_json::json!({
                "dependency_cycle": cycle,
                "inconsistent_applications": inconsistencies,
            }))?;

            if !healthy {
                return Err(MicoError::custom(anyhow::anyhow!("catalog check failed")));
            }
        }
        MicoSubcommand::PromoteService {
            short_name,
            version,
            new_version,
        } => {
            let promoted = core
                .get_catalog()
                .promote(&short_name, &version, &new_version)
                .await?;
            core.export_snapshot().await.save(&snapshot_path).await?;
            print(&promoted)?;
        }
        MicoSubcommand::PromoteApp {
            short_name,
            version,
            new_version,
        } => {
            let promoted = core
                .get_composer()
                .copy_and_upgrade(&short_name, &version, &new_version)
                .await?;
            core.export_snapshot().await.save(&snapshot_path).await?;
            print(&promoted)?;
        }
        MicoSubcommand::Status {
            short_name,
            version,
        } => {
            print(
                &core
                    .get_reconciler()
                    .application_status(&short_name, &version)
                    .await?,
            )?;
        }
        MicoSubcommand::ServiceStatus {
            short_name,
            version,
        } => {
            print(
                &core
                    .get_reconciler()
                    .service_status(&short_name, &version)
                    .await?,
            )?;
        }
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: *
//--------------------------------------------------------------------------------------------------

fn print(value: &impl Serialize) -> MicoResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
