use crate::cli::output::*;
use crate::cli::OutputFormat;
use anyhow::Result;
use clap::Args;
use culicidae_catalog::{Catalog, ReferenceDataset};
use culicidae_core::Config;
use std::path::PathBuf;

#[derive(Args)]
pub struct ImportArgs {
    /// Directory holding species.json, diseases.json, regions.json and optionally filter_options.json
    pub dir: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

pub fn run(args: ImportArgs, config: Config) -> Result<()> {
    let dataset = ReferenceDataset::from_dir(&args.dir)?;
    let catalog = Catalog::open(config)?;
    let stats = catalog.import(&dataset)?;

    match args.format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Text => {
            success(&format!("Imported reference data from {}", args.dir.display()));
            tree(&[
                ("Species", stats.species.to_string()),
                ("Diseases", stats.diseases.to_string()),
                ("Regions", stats.regions.to_string()),
                ("Facet labels", stats.facet_labels.to_string()),
                (
                    "Embedding dimension",
                    stats
                        .embedding_dim
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "none".to_string()),
                ),
            ]);
        }
    }
    Ok(())
}
