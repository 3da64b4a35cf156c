pub mod commands;
pub mod output;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use culicidae_core::Config;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "culicidae",
    version,
    about = "Mosquito species catalog, geo queries and observation intake",
    long_about = "Culicidae serves a localized catalog of mosquito species, the diseases they \
                  carry and the regions they live in. It answers filtered and similarity \
                  searches, point-in-region and bounding-box queries, and ingests field \
                  observations with automatic species prediction."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to $CULICIDAE_HOME/config.toml when present)
    #[arg(short, long, global = true, env = "CULICIDAE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load reference data from a seed directory
    Import(commands::import::ImportArgs),

    /// Search and inspect species
    Species {
        #[command(subcommand)]
        command: commands::species::SpeciesCommands,
    },

    /// Search and inspect diseases
    Diseases {
        #[command(subcommand)]
        command: commands::diseases::DiseaseCommands,
    },

    /// Search regions and locate points
    Regions {
        #[command(subcommand)]
        command: commands::regions::RegionCommands,
    },

    /// Show filter options with counts
    Facets(commands::facets::FacetsArgs),

    /// Submit an observation image
    Observe(commands::observe::ObserveArgs),

    /// Browse and review stored observations
    Observations {
        #[command(subcommand)]
        command: commands::observations::ObservationCommands,
    },

    /// Show resolved data directories
    Paths,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// Output and language options shared by read commands
#[derive(Args, Clone, Debug)]
pub struct ViewArgs {
    /// Language tag (en, ru, es, fr, pt, de); others fall back to the default
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

#[derive(Args, Clone, Debug)]
pub struct PageArgs {
    /// Page size, clamped to the configured maximum
    #[arg(long, allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Number of results to skip
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<i64>,
}

/// Explicit file, then $CULICIDAE_HOME/config.toml, then defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        debug!(path = %path.display(), "loading config");
        return culicidae_core::load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = culicidae_core::culicidae_home().join("config.toml");
    if default_path.exists() {
        debug!(path = %default_path.display(), "loading config");
        return culicidae_core::load_config(&default_path)
            .with_context(|| format!("Failed to load config from {}", default_path.display()));
    }
    Ok(Config::default())
}
