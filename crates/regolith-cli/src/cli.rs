//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Regolith - Run filter pipelines over Minecraft Bedrock add-ons
#[derive(Parser, Debug)]
#[command(name = "regolith")]
#[command(author, version, about = "Run filter pipelines over Minecraft Bedrock add-ons", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true, env = "REGOLITH_PROJECT")]
    pub project: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run a profile and export the result
    ///
    /// Examples:
    ///   regolith run                               # Run the default profile
    ///   regolith run build                         # Run the build profile
    ///   regolith run -e size_time_check            # Keep the workspace between runs
    Run {
        /// Profile to run
        #[arg(default_value = "default")]
        profile: String,

        /// Experimental features to enable
        #[arg(short, long = "experiment")]
        experiments: Vec<String>,
    },

    /// Validate a profile without running it
    Check {
        /// Profile to check
        #[arg(default_value = "default")]
        profile: String,
    },

    /// Install the dependencies of every filter definition
    InstallDeps,

    /// Remove the workspace and the export caches
    Clean,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn about_names_the_tool() {
        use clap::CommandFactory;

        let about = Cli::command().get_about().map(|a| a.to_string()).unwrap_or_default();
        assert!(about.contains("filter pipelines"));
    }

    #[test]
    fn run_defaults_to_the_default_profile() {
        let cli = Cli::parse_from(["regolith", "run"]);
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                profile: "default".to_string(),
                experiments: vec![],
            })
        );
    }

    #[test]
    fn experiments_repeat() {
        let cli = Cli::parse_from(["regolith", "run", "build", "-e", "a", "--experiment", "b"]);
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                profile: "build".to_string(),
                experiments: vec!["a".to_string(), "b".to_string()],
            })
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["regolith", "clean", "--verbose", "-C", "/tmp/project"]);
        assert!(cli.verbose);
        assert_eq!(cli.project, Some(PathBuf::from("/tmp/project")));
        assert_eq!(cli.command, Some(Commands::Clean));
    }
}
