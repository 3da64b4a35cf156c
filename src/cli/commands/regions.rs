use super::open_catalog;
use crate::cli::output::*;
use crate::cli::{OutputFormat, PageArgs, ViewArgs};
use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use culicidae_catalog::{RegionQuery, RegionView};
use culicidae_core::Config;

#[derive(Subcommand)]
pub enum RegionCommands {
    /// Search regions by name
    List(ListArgs),

    /// Show one region with its bounding box
    Show {
        id: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Regions containing a point (boundaries inclusive)
    At {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,

        #[arg(allow_negative_numbers = true)]
        longitude: f64,

        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args)]
pub struct ListArgs {
    /// Case-insensitive substring of the region name
    #[arg(short, long)]
    pub term: Option<String>,

    #[command(flatten)]
    pub page: PageArgs,

    #[command(flatten)]
    pub view: ViewArgs,
}

fn print_regions(regions: &[RegionView]) {
    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Name"),
        header_cell("Latitude"),
        header_cell("Longitude"),
    ]);
    for r in regions {
        table.add_row(vec![
            Cell::new(&r.id),
            Cell::new(&r.name),
            Cell::new(format!("{} .. {}", r.bbox.min_lat, r.bbox.max_lat)),
            Cell::new(format!("{} .. {}", r.bbox.min_lon, r.bbox.max_lon)),
        ]);
    }
    println!("{}", table);
}

pub fn run(command: RegionCommands, config: Config) -> Result<()> {
    let catalog = open_catalog(config)?;

    match command {
        RegionCommands::List(args) => {
            let page = catalog.query().search_regions(&RegionQuery {
                term: args.term,
                locale: args.view.lang,
                limit: args.page.limit,
                offset: args.page.offset,
            })?;
            match args.view.format {
                OutputFormat::Json => print_json(&page),
                OutputFormat::Text if page.results.is_empty() => {
                    empty("No regions matched");
                    Ok(())
                }
                OutputFormat::Text => {
                    print_regions(&page.results);
                    page_footer(&page);
                    Ok(())
                }
            }
        }
        RegionCommands::Show { id, view } => {
            let region = catalog.cache().region(&id, view.lang.as_deref())?;
            match view.format {
                OutputFormat::Json => print_json(&region),
                OutputFormat::Text => {
                    print_regions(std::slice::from_ref(&region));
                    Ok(())
                }
            }
        }
        RegionCommands::At {
            latitude,
            longitude,
            view,
        } => {
            let regions = catalog
                .geo()
                .regions_at(latitude, longitude, view.lang.as_deref())?;
            match view.format {
                OutputFormat::Json => print_json(&regions),
                OutputFormat::Text if regions.is_empty() => {
                    empty(&format!("No region contains ({}, {})", latitude, longitude));
                    Ok(())
                }
                OutputFormat::Text => {
                    print_regions(&regions);
                    Ok(())
                }
            }
        }
    }
}
