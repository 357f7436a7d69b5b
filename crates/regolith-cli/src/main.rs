//! Regolith CLI
//!
//! Runs profiles of a Regolith project and exports the result.

mod cli;
mod commands;
mod error;

use std::error::Error as _;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  {} {}", "caused by:".yellow(), cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
    tracing::debug!("Verbose mode enabled");

    let root = match cli.project {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Some(cmd) => execute_command(cmd, root),
        None => {
            println!("{} Regolith CLI", "regolith".green().bold());
            println!();
            println!("Run {} for available commands.", "regolith --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands, root: PathBuf) -> Result<()> {
    match cmd {
        Commands::Run {
            profile,
            experiments,
        } => commands::run_run(&root, &profile, &experiments),
        Commands::Check { profile } => commands::run_check(&root, &profile),
        Commands::InstallDeps => commands::run_install_deps(&root),
        Commands::Clean => commands::run_clean(&root),
    }
}
