use super::open_catalog;
use crate::cli::output::*;
use crate::cli::{OutputFormat, PageArgs, ViewArgs};
use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use culicidae_catalog::{Page, SpeciesQuery, SpeciesView};
use culicidae_core::Config;
use serde::Serialize;

#[derive(Subcommand)]
pub enum SpeciesCommands {
    /// Search species by name and facets
    List(ListArgs),

    /// Show one species with its diseases
    Show {
        id: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Rank species by similarity to a stored species
    Similar {
        id: String,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        page: PageArgs,

        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args, Clone, Debug)]
pub struct FilterArgs {
    /// Case-insensitive substring of the scientific or common name
    #[arg(short, long)]
    pub term: Option<String>,

    /// Only species found in this region
    #[arg(long)]
    pub region: Option<String>,

    /// Only species carrying this disease
    #[arg(long)]
    pub disease: Option<String>,

    /// Only disease vectors
    #[arg(long, conflicts_with = "non_vector")]
    pub vector: bool,

    /// Only species that are not disease vectors
    #[arg(long)]
    pub non_vector: bool,
}

impl FilterArgs {
    fn is_vector(&self) -> Option<bool> {
        match (self.vector, self.non_vector) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    fn to_query(&self, page: &PageArgs, view: &ViewArgs) -> SpeciesQuery {
        SpeciesQuery {
            term: self.term.clone(),
            region_id: self.region.clone(),
            disease_id: self.disease.clone(),
            is_vector: self.is_vector(),
            locale: view.lang.clone(),
            limit: page.limit,
            offset: page.offset,
            embedding: None,
        }
    }
}

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Rank by similarity to this comma-separated embedding
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub embedding: Option<Vec<f32>>,

    #[command(flatten)]
    pub page: PageArgs,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Serialize)]
struct SpeciesDetail {
    #[serde(flatten)]
    species: SpeciesView,
    diseases: Vec<culicidae_catalog::DiseaseView>,
}

pub fn run(command: SpeciesCommands, config: Config) -> Result<()> {
    let catalog = open_catalog(config)?;

    match command {
        SpeciesCommands::List(args) => {
            let query = SpeciesQuery {
                embedding: args.embedding.clone(),
                ..args.filters.to_query(&args.page, &args.view)
            };
            let page = catalog.query().search_species(&query)?;
            print_page(&page, args.view.format)
        }
        SpeciesCommands::Show { id, view } => {
            let lang = view.lang.as_deref();
            let detail = SpeciesDetail {
                species: catalog.cache().species(&id, lang)?,
                diseases: catalog.cache().diseases_for_species(&id, lang)?,
            };
            match view.format {
                OutputFormat::Json => print_json(&detail),
                OutputFormat::Text => {
                    let s = &detail.species;
                    section_header(&format!("{} ({})", s.scientific_name, s.common_name));
                    let diseases: Vec<&str> =
                        detail.diseases.iter().map(|d| d.name.as_str()).collect();
                    tree(&[
                        ("ID", s.id.clone()),
                        ("Vector", yes_no(s.is_vector)),
                        ("Regions", s.region_ids.join(", ")),
                        ("Diseases", diseases.join(", ")),
                        ("Language", s.locale.to_string()),
                    ]);
                    Ok(())
                }
            }
        }
        SpeciesCommands::Similar {
            id,
            filters,
            page,
            view,
        } => {
            let query = filters.to_query(&page, &view);
            let page = catalog.query().similar_species(&id, &query)?;
            print_page(&page, view.format)
        }
    }
}

fn print_page(page: &Page<SpeciesView>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(page);
    }
    if page.results.is_empty() {
        empty("No species matched");
        return Ok(());
    }

    let mut table = create_standard_table();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Scientific name"),
        header_cell("Common name"),
        header_cell("Vector"),
        header_cell("Similarity"),
    ]);
    for s in &page.results {
        table.add_row(vec![
            Cell::new(&s.id),
            Cell::new(&s.scientific_name),
            Cell::new(&s.common_name),
            Cell::new(if s.is_vector { "yes" } else { "no" }),
            Cell::new(s.similarity.map(|v| format!("{:.3}", v)).unwrap_or_default()),
        ]);
    }
    println!("{}", table);
    page_footer(page);
    Ok(())
}
