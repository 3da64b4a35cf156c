use super::{open_catalog, runtime};
use crate::cli::output::*;
use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use clap::Args;
use culicidae_catalog::ObservationSubmission;
use culicidae_core::Config;
use std::path::PathBuf;

#[derive(Args)]
pub struct ObserveArgs {
    /// JPEG, PNG or WebP photo of the specimen
    pub image: PathBuf,

    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Known species id; skips prediction
    #[arg(long)]
    pub species: Option<String>,

    #[arg(long)]
    pub observer: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

pub fn run(args: ObserveArgs, config: Config) -> Result<()> {
    let image = std::fs::read(&args.image)
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let catalog = open_catalog(config)?;

    let submission = ObservationSubmission {
        image,
        species_id: args.species,
        latitude: args.lat,
        longitude: args.lon,
        observer_name: args.observer,
        notes: args.notes,
    };
    let outcome = runtime()?.block_on(catalog.pipeline().submit(submission))?;
    catalog.gateway().flush()?;

    match args.format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Text => {
            let observation = &outcome.observation;
            match observation.species_id.as_deref() {
                Some(species) => success(&format!(
                    "Observation {} recorded as {}",
                    observation.id, species
                )),
                None => warning(&format!(
                    "Observation {} stored for review ({:?})",
                    observation.id, observation.prediction_status
                )),
            }
            tree(&[
                ("Regions", observation.region_ids.join(", ")),
                ("Images", outcome.artifacts.directory.display().to_string()),
            ]);
            Ok(())
        }
    }
}
