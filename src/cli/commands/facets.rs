use super::open_catalog;
use crate::cli::output::*;
use crate::cli::{OutputFormat, ViewArgs};
use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use culicidae_catalog::FacetOption;
use culicidae_core::Config;

#[derive(Args)]
pub struct FacetsArgs {
    #[command(flatten)]
    pub view: ViewArgs,
}

fn print_options(title: &str, options: &[FacetOption]) {
    section_header(title);
    if options.is_empty() {
        empty("none");
        return;
    }
    let mut table = create_standard_table();
    table.set_header(vec![header_cell("Value"), header_cell("Label"), header_cell("Species")]);
    for option in options {
        table.add_row(vec![
            Cell::new(&option.value),
            Cell::new(&option.label),
            Cell::new(option.count),
        ]);
    }
    println!("{}", table);
}

pub fn run(args: FacetsArgs, config: Config) -> Result<()> {
    let catalog = open_catalog(config)?;
    let options = catalog.cache().list_facets(args.view.lang.as_deref())?;

    match args.view.format {
        OutputFormat::Json => print_json(&options),
        OutputFormat::Text => {
            print_options("Regions", &options.regions);
            print_options("Diseases", &options.diseases);
            print_options("Vector status", &options.vector_status);
            Ok(())
        }
    }
}
