use std::{path::PathBuf, sync::LazyLock};

use crate::utils::MICO_HOME_DIR;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The number of replicas a service is deployed with when its deployment information does not
/// say otherwise.
pub const DEFAULT_REPLICAS: u32 = 1;

/// The default time in milliseconds an orchestration platform call may take.
pub const DEFAULT_ORCHESTRATION_TIMEOUT_MS: u64 = 10_000;

/// The default number of terminal background jobs kept per logical key.
pub const DEFAULT_JOB_HISTORY_LIMIT: usize = 16;

/// The name of the configuration file inside the mico home directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "mico.yaml";

/// The name of the catalog snapshot file inside the mico home directory.
pub const DEFAULT_SNAPSHOT_FILENAME: &str = "catalog.json";

/// The environment variable that overrides the mico home directory.
pub const MICO_HOME_ENV_VAR: &str = "MICO_HOME";

/// The path where all mico global data is stored.
pub static DEFAULT_MICO_HOME: LazyLock<PathBuf> = LazyLock::new(|| {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(MICO_HOME_DIR)
});
