use std::path::PathBuf;

use clap::Parser;

use super::styles;

//-------------------------------------------------------------------------------------------------
// Types
//-------------------------------------------------------------------------------------------------

/// mico - Inspect and promote versioned services and the applications composed from them
#[derive(Debug, Parser)]
#[command(name = "mico", author, about, version, styles=styles::styles())]
pub struct MicoArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: Option<MicoSubcommand>,

    /// The mico home directory. Defaults to `$MICO_HOME` or `~/.mico`
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// The configuration file. Defaults to `mico.yaml` in the home directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The catalog snapshot. Defaults to `catalog.json` in the home directory
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// JSON file describing the cluster. Without it every service is reported as not deployed
    #[arg(long, global = true)]
    pub cluster: Option<PathBuf>,
}

/// Available subcommands
#[derive(Debug, Parser)]
pub enum MicoSubcommand {
    /// List services, or every version of one service
    #[command(name = "services")]
    Services {
        /// Short name of the service
        #[arg(value_name = "SHORT_NAME")]
        short_name: Option<String>,
    },

    /// List the services that depend on a service
    #[command(name = "dependers")]
    Dependers {
        /// Short name of the service
        short_name: String,

        /// Version of the service
        version: String,
    },

    /// List every service a service transitively depends on
    #[command(name = "closure")]
    Closure {
        /// Short name of the service
        short_name: String,

        /// Version of the service
        version: String,
    },

    /// Check the dependency graph for cycles and applications for consistency
    #[command(name = "check")]
    Check,

    /// Copy a service under a new version
    #[command(name = "promote-service")]
    PromoteService {
        /// Short name of the service
        short_name: String,

        /// Version to copy
        version: String,

        /// Version of the copy
        new_version: String,
    },

    /// Copy an application under a new version
    #[command(name = "promote-app")]
    PromoteApp {
        /// Short name of the application
        short_name: String,

        /// Version to copy
        version: String,

        /// Version of the copy
        new_version: String,
    },

    /// Show the status of an application
    #[command(name = "status")]
    Status {
        /// Short name of the application
        short_name: String,

        /// Version of the application
        version: String,
    },

    /// Show the status of a single service
    #[command(name = "service-status")]
    ServiceStatus {
        /// Short name of the service
        short_name: String,

        /// Version of the service
        version: String,
    },
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_are_well_formed() {
        MicoArgs::command().debug_assert();
    }

    #[test]
    fn test_global_flags_follow_subcommand() -> anyhow::Result<()> {
        let args = MicoArgs::try_parse_from([
            "mico",
            "promote-service",
            "svc-a",
            "1.0.0",
            "1.1.0",
            "--snapshot",
            "/tmp/catalog.json",
        ])?;

        assert_eq!(args.snapshot, Some(PathBuf::from("/tmp/catalog.json")));
        assert!(matches!(
            args.subcommand,
            Some(MicoSubcommand::PromoteService { ref new_version, .. }) if new_version == "1.1.0"
        ));

        Ok(())
    }
}
