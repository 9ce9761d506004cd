use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    models::{MicoApplication, MicoService},
    MicoResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Everything stored in a core: services with their dependency edges, and applications with
/// their deployment information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// The services, each listing its outgoing dependencies.
    #[serde(default)]
    pub services: Vec<MicoService>,

    /// The applications.
    #[serde(default)]
    pub applications: Vec<MicoApplication>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl CatalogSnapshot {
    /// Reads a snapshot from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> MicoResult<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&contents)?;

        tracing::debug!(
            path = %path.as_ref().display(),
            services = snapshot.services.len(),
            applications = snapshot.applications.len(),
            "loaded catalog snapshot"
        );
        Ok(snapshot)
    }

    /// Writes the snapshot to a JSON file, creating the parent directory if needed.
    pub async fn save(&self, path: impl AsRef<Path>) -> MicoResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        tracing::debug!(path = %path.display(), "saved catalog snapshot");
        Ok(())
    }
}
