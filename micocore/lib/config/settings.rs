use std::{path::Path, time::Duration};

use getset::CopyGetters;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{MicoError, MicoResult};

use super::{DEFAULT_JOB_HISTORY_LIMIT, DEFAULT_ORCHESTRATION_TIMEOUT_MS, DEFAULT_REPLICAS};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Runtime settings of a mico core.
///
/// Every field is optional in the YAML file and falls back to its default.
///
/// ## Examples
///
/// ```
/// use micocore::config::MicoConfig;
///
/// let config = MicoConfig::builder().default_replicas(2).build();
/// assert_eq!(config.get_default_replicas(), 2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, CopyGetters)]
#[getset(get_copy = "pub with_prefix")]
pub struct MicoConfig {
    /// Replicas used when a deployment info leaves them unset.
    #[serde(default = "default_replicas")]
    #[builder(default = DEFAULT_REPLICAS)]
    default_replicas: u32,

    /// Upper bound in milliseconds for each orchestration platform call.
    #[serde(default = "default_orchestration_timeout_ms")]
    #[builder(default = DEFAULT_ORCHESTRATION_TIMEOUT_MS)]
    orchestration_timeout_ms: u64,

    /// Terminal background jobs kept per logical key.
    #[serde(default = "default_job_history_limit")]
    #[builder(default = DEFAULT_JOB_HISTORY_LIMIT)]
    job_history_limit: usize,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MicoConfig {
    /// Reads the configuration from a YAML file.
    pub async fn load(path: impl AsRef<Path>) -> MicoResult<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        let config: MicoConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;

        tracing::debug!(path = %path.as_ref().display(), "loaded configuration");
        Ok(config)
    }

    /// Reads the configuration from a YAML file, or returns the defaults if the file does not
    /// exist.
    pub async fn load_or_default(path: impl AsRef<Path>) -> MicoResult<Self> {
        if !tokio::fs::try_exists(path.as_ref()).await? {
            tracing::debug!(
                path = %path.as_ref().display(),
                "configuration file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path).await
    }

    /// Checks that the settings are usable.
    pub fn validate(&self) -> MicoResult<()> {
        if self.default_replicas == 0 {
            return Err(MicoError::ConfigValidation(
                "default_replicas must be at least 1".to_string(),
            ));
        }

        if self.orchestration_timeout_ms == 0 {
            return Err(MicoError::ConfigValidation(
                "orchestration_timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the orchestration call timeout.
    pub fn orchestration_timeout(&self) -> Duration {
        Duration::from_millis(self.orchestration_timeout_ms)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for MicoConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Serde Defaults
//--------------------------------------------------------------------------------------------------

fn default_replicas() -> u32 {
    DEFAULT_REPLICAS
}

fn default_orchestration_timeout_ms() -> u64 {
    DEFAULT_ORCHESTRATION_TIMEOUT_MS
}

fn default_job_history_limit() -> usize {
    DEFAULT_JOB_HISTORY_LIMIT
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
