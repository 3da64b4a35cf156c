use super::{open_catalog, runtime};
use crate::cli::output::*;
use crate::cli::{OutputFormat, PageArgs};
use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use culicidae_catalog::{ObservationQuery, ObservationUpdate};
use culicidae_core::{BoundingBox, Config, Observation};

#[derive(Subcommand)]
pub enum ObservationCommands {
    /// List stored observations, newest first
    List(ListArgs),

    /// Show one observation
    Show {
        id: String,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Observations inside a bounding box (edges inclusive)
    Bbox {
        #[command(flatten)]
        bbox: BboxArgs,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Observations inside a region, optionally within a box
    Region {
        id: String,

        /// Restrict to MIN_LAT,MIN_LON,MAX_LAT,MAX_LON
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        within: Option<Vec<f64>>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Confirm the species of an observation or amend its notes
    Review {
        id: String,

        #[arg(long)]
        species: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    pub species: Option<String>,

    /// Only observations awaiting review
    #[arg(long)]
    pub needs_review: bool,

    #[command(flatten)]
    pub page: PageArgs,

    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct BboxArgs {
    #[arg(allow_negative_numbers = true)]
    pub min_lat: f64,
    #[arg(allow_negative_numbers = true)]
    pub min_lon: f64,
    #[arg(allow_negative_numbers = true)]
    pub max_lat: f64,
    #[arg(allow_negative_numbers = true)]
    pub max_lon: f64,
}

fn print_observations(observations: &[Observation], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(observations);
    }
    if observations.is_empty() {
        empty("No observations");
        return Ok(());
    }

    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Species"),
        header_cell("Review"),
        header_cell("Location"),
        header_cell("Regions"),
        header_cell("Created"),
    ]);
    for o in observations {
        table.add_row(vec![
            Cell::new(&o.id),
            Cell::new(o.species_id.as_deref().unwrap_or("-")),
            Cell::new(if o.needs_review { "pending" } else { "" }),
            Cell::new(format!("{:.5}, {:.5}", o.location.latitude, o.location.longitude)),
            Cell::new(o.region_ids.join(", ")),
            Cell::new(o.created_at.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    println!("{}", table);
    Ok(())
}

pub fn run(command: ObservationCommands, config: Config) -> Result<()> {
    let catalog = open_catalog(config)?;
    let pipeline = catalog.pipeline();

    match command {
        ObservationCommands::List(args) => {
            let page = pipeline.list_observations(&ObservationQuery {
                species_id: args.species,
                needs_review: args.needs_review.then_some(true),
                limit: args.page.limit,
                offset: args.page.offset,
            })?;
            if args.format == OutputFormat::Json {
                return print_json(&page);
            }
            print_observations(&page.results, args.format)?;
            page_footer(&page);
            Ok(())
        }
        ObservationCommands::Show { id, format } => {
            let observation = pipeline.observation(&id)?;
            match format {
                OutputFormat::Json => print_json(&observation),
                OutputFormat::Text => print_observations(std::slice::from_ref(&observation), format),
            }
        }
        ObservationCommands::Bbox { bbox, format } => {
            let bbox = BoundingBox::new(bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon)?;
            let observations = catalog.geo().observations_in_bbox(&bbox)?;
            print_observations(&observations, format)
        }
        ObservationCommands::Region { id, within, format } => {
            let bbox = match within.as_deref() {
                Some(&[min_lat, min_lon, max_lat, max_lon]) => {
                    Some(BoundingBox::new(min_lat, min_lon, max_lat, max_lon)?)
                }
                Some(_) => anyhow::bail!("--within takes exactly four comma-separated numbers"),
                None => None,
            };
            let observations = catalog.geo().observations_in_region(&id, bbox.as_ref())?;
            print_observations(&observations, format)
        }
        ObservationCommands::Review {
            id,
            species,
            notes,
            format,
        } => {
            let update = ObservationUpdate {
                species_id: species,
                notes,
            };
            let observation = runtime()?.block_on(pipeline.update_observation(&id, update))?;
            catalog.gateway().flush()?;
            match format {
                OutputFormat::Json => print_json(&observation),
                OutputFormat::Text => {
                    success(&format!("Observation {} updated", observation.id));
                    Ok(())
                }
            }
        }
    }
}
