use std::{env, path::PathBuf};

use crate::config::{DEFAULT_MICO_HOME, MICO_HOME_ENV_VAR};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the mico home directory: `$MICO_HOME` if set, `~/.mico` otherwise.
pub fn mico_home() -> PathBuf {
    match env::var(MICO_HOME_ENV_VAR) {
        Ok(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            tracing::debug!(
                "{} is not set, using default: {}",
                MICO_HOME_ENV_VAR,
                DEFAULT_MICO_HOME.display()
            );
            DEFAULT_MICO_HOME.clone()
        }
    }
}
