//! `micocore` manages a catalog of versioned, interdependent services and reconciles their
//! deployment status against a container-orchestration cluster.
//!
//! # Overview
//!
//! A service is identified by its short name and version. Services depend on one another,
//! optionally constraining the versions they accept, and are composed into versioned
//! applications that carry per-service deployment information. micocore keeps:
//!
//! - **Catalog**: services and the dependency graph between them
//! - **Composer**: applications and their deployment information
//! - **Jobs**: build, deploy and undeploy jobs with at most one in flight per service and type
//! - **Status**: snapshots merging the desired configuration with what the cluster reports
//!
//! # Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use micocore::{
//!     config::MicoConfig,
//!     management::MicoCore,
//!     models::{MicoApplication, MicoService},
//!     orchestration::StaticClusterClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let core = MicoCore::new(MicoConfig::default(), Arc::new(StaticClusterClient::default()))?;
//!
//!     let api = core
//!         .get_catalog()
//!         .persist(
//!             MicoService::builder()
//!                 .short_name("api")
//!                 .version("1.0.0")
//!                 .name("API")
//!                 .build(),
//!         )
//!         .await?;
//!
//!     let shop = core
//!         .get_composer()
//!         .create(
//!             MicoApplication::builder()
//!                 .short_name("shop")
//!                 .version("1.0.0")
//!                 .name("Shop")
//!                 .services(vec![api.identity()])
//!                 .build(),
//!         )
//!         .await?;
//!
//!     let status = core.get_reconciler().application_status("shop", "1.0.0").await?;
//!     assert_eq!(status.service_statuses.len(), shop.get_services().len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`catalog`] - Services and their dependency graph
//! - [`cli`] - Command-line interface and argument parsing
//! - [`composer`] - Applications and deployment information
//! - [`config`] - Configuration types and defaults
//! - [`jobs`] - Background job tracking
//! - [`management`] - Component wiring and snapshots
//! - [`models`] - Domain types
//! - [`orchestration`] - Access to the container-orchestration platform
//! - [`status`] - Status reconciliation
//! - [`utils`] - Common utilities and helpers

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod catalog;
pub mod cli;
pub mod composer;
pub mod config;
pub mod jobs;
pub mod management;
pub mod models;
pub mod orchestration;
pub mod status;
pub mod utils;

pub use error::*;
