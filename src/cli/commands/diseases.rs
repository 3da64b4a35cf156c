use super::open_catalog;
use crate::cli::output::*;
use crate::cli::{OutputFormat, PageArgs, ViewArgs};
use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use culicidae_catalog::{DiseaseQuery, DiseaseView, SpeciesView};
use culicidae_core::Config;
use serde::Serialize;

#[derive(Subcommand)]
pub enum DiseaseCommands {
    /// Search diseases by name
    List(ListArgs),

    /// Show one disease with its vector species
    Show {
        id: String,

        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args)]
pub struct ListArgs {
    /// Case-insensitive substring of the disease name
    #[arg(short, long)]
    pub term: Option<String>,

    /// Only diseases carried by this species
    #[arg(long, value_name = "SPECIES_ID")]
    pub vector: Option<String>,

    #[command(flatten)]
    pub page: PageArgs,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Serialize)]
struct DiseaseDetail {
    #[serde(flatten)]
    disease: DiseaseView,
    vectors: Vec<SpeciesView>,
}

pub fn run(command: DiseaseCommands, config: Config) -> Result<()> {
    let catalog = open_catalog(config)?;

    match command {
        DiseaseCommands::List(args) => {
            let page = catalog.query().search_diseases(&DiseaseQuery {
                term: args.term,
                vector_species_id: args.vector,
                locale: args.view.lang,
                limit: args.page.limit,
                offset: args.page.offset,
            })?;

            if args.view.format == OutputFormat::Json {
                return print_json(&page);
            }
            if page.results.is_empty() {
                empty("No diseases matched");
                return Ok(());
            }
            let mut table = create_standard_table();
            table.set_header(vec![
                header_cell("ID"),
                header_cell("Name"),
                header_cell("Vectors"),
            ]);
            for d in &page.results {
                table.add_row(vec![
                    Cell::new(&d.id),
                    Cell::new(&d.name),
                    Cell::new(d.vector_species_ids.len()),
                ]);
            }
            println!("{}", table);
            page_footer(&page);
            Ok(())
        }
        DiseaseCommands::Show { id, view } => {
            let lang = view.lang.as_deref();
            let detail = DiseaseDetail {
                disease: catalog.cache().disease(&id, lang)?,
                vectors: catalog.cache().vectors_for_disease(&id, lang)?,
            };
            match view.format {
                OutputFormat::Json => print_json(&detail),
                OutputFormat::Text => {
                    section_header(&detail.disease.name);
                    let vectors: Vec<&str> = detail
                        .vectors
                        .iter()
                        .map(|s| s.scientific_name.as_str())
                        .collect();
                    tree(&[
                        ("ID", detail.disease.id.clone()),
                        (
                            "Description",
                            detail.disease.description.clone().unwrap_or_default(),
                        ),
                        ("Vectors", vectors.join(", ")),
                    ]);
                    Ok(())
                }
            }
        }
    }
}
