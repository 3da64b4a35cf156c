use clap::Parser;
use colored::*;
use std::process;

mod cli;

use crate::cli::{Cli, Commands};
use culicidae_core::{CatalogError, ErrorKind};

fn main() {
    let cli = Cli::parse();

    // CULICIDAE_LOG, then RUST_LOG, then warn
    culicidae_core::logging::init_logging("warn", cli.log_json);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        // Use appropriate exit codes based on error kind
        let exit_code = match e.downcast_ref::<CatalogError>().map(CatalogError::kind) {
            Some(ErrorKind::ValidationError) => 2,
            Some(ErrorKind::NotFound) => 3,
            Some(ErrorKind::CacheLoadFailure) => 4,
            Some(ErrorKind::StoreUnavailable) => 5,
            Some(ErrorKind::PredictionUnavailable) | Some(ErrorKind::PredictionTimeout) => 6,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Import(args) => crate::cli::commands::import::run(args, config),
        Commands::Species { command } => crate::cli::commands::species::run(command, config),
        Commands::Diseases { command } => crate::cli::commands::diseases::run(command, config),
        Commands::Regions { command } => crate::cli::commands::regions::run(command, config),
        Commands::Facets(args) => crate::cli::commands::facets::run(args, config),
        Commands::Observe(args) => crate::cli::commands::observe::run(args, config),
        Commands::Observations { command } => {
            crate::cli::commands::observations::run(command, config)
        }
        Commands::Paths => crate::cli::commands::paths::run(config),
    }
}
