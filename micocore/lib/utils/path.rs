use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_CONFIG_FILENAME, DEFAULT_SNAPSHOT_FILENAME};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The sub directory of the user's home where mico keeps its files.
pub const MICO_HOME_DIR: &str = ".mico";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the path of the configuration file inside `home`.
pub fn config_path(home: &Path) -> PathBuf {
    home.join(DEFAULT_CONFIG_FILENAME)
}

/// Returns the path of the catalog snapshot inside `home`.
pub fn snapshot_path(home: &Path) -> PathBuf {
    home.join(DEFAULT_SNAPSHOT_FILENAME)
}
