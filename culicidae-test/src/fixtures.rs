//! Test fixtures and data generators
//!
//! A small reference dataset shared across the culicidae workspace. Embeddings
//! are 4-dimensional so similarity rankings are easy to reason about.

use anyhow::Result;
use culicidae_catalog::ReferenceDataset;
use culicidae_core::{
    Disease, FacetKind, FacetLabel, Locale, LocalizedText, Region, RegionGeometry, Species,
};
use culicidae_storage::{table_names, Gateway};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;

/// Point inside the `new-york` region
pub const NYC: (f64, f64) = (40.7128, -74.0060);

fn text(en: &str, ru: Option<&str>) -> LocalizedText {
    let text = LocalizedText::new().with(Locale::En, en);
    match ru {
        Some(ru) => text.with(Locale::Ru, ru),
        None => text,
    }
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Closed-by-construction rectangle in `[lon, lat]` order
pub fn rectangle(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Vec<[f64; 2]> {
    vec![
        [min_lon, min_lat],
        [max_lon, min_lat],
        [max_lon, max_lat],
        [min_lon, max_lat],
        [min_lon, min_lat],
    ]
}

#[allow(clippy::too_many_arguments)]
fn species_row(
    id: &str,
    scientific_name: &str,
    common_names: LocalizedText,
    embedding: [f32; 4],
    is_vector: bool,
    region_ids: &[&str],
    disease_ids: &[&str],
) -> Species {
    Species {
        id: id.to_string(),
        scientific_name: scientific_name.to_string(),
        common_names,
        vector_embedding: embedding.to_vec(),
        is_vector,
        region_ids: ids(region_ids),
        disease_ids: ids(disease_ids),
        metadata: serde_json::json!({ "genus": scientific_name.split(' ').next() }),
    }
}

pub fn species() -> Vec<Species> {
    vec![
        species_row(
            "aedes-aegypti",
            "Aedes aegypti",
            text("Yellow fever mosquito", Some("Желтолихорадочный комар")),
            [1.0, 0.0, 0.0, 0.0],
            true,
            &["new-york", "southeast-asia", "west-africa"],
            &["dengue", "yellow-fever", "zika"],
        ),
        species_row(
            "aedes-albopictus",
            "Aedes albopictus",
            text("Asian tiger mosquito", Some("Азиатский тигровый комар")),
            [0.9, 0.1, 0.0, 0.0],
            true,
            &["new-york", "southeast-asia"],
            &["dengue"],
        ),
        species_row(
            "anopheles-gambiae",
            "Anopheles gambiae",
            text("African malaria mosquito", Some("Малярийный комар")),
            [0.0, 1.0, 0.0, 0.0],
            true,
            &["west-africa"],
            &["malaria"],
        ),
        species_row(
            "culex-pipiens",
            "Culex pipiens",
            text("Common house mosquito", Some("Комар обыкновенный")),
            [0.2, 0.0, 1.0, 0.0],
            true,
            &["new-york", "fiji"],
            &["west-nile"],
        ),
        species_row(
            "toxorhynchites-rutilus",
            "Toxorhynchites rutilus",
            text("Elephant mosquito", None),
            [0.0, 0.0, 0.0, 1.0],
            false,
            &["new-york"],
            &[],
        ),
    ]
}

fn disease_row(id: &str, en: &str, ru: &str, description: &str, vectors: &[&str]) -> Disease {
    Disease {
        id: id.to_string(),
        names: text(en, Some(ru)),
        descriptions: LocalizedText::new().with(Locale::En, description),
        vector_species_ids: ids(vectors),
    }
}

pub fn diseases() -> Vec<Disease> {
    vec![
        disease_row(
            "dengue",
            "Dengue fever",
            "Лихорадка денге",
            "Viral infection transmitted by Aedes mosquitoes",
            &["aedes-aegypti", "aedes-albopictus"],
        ),
        disease_row(
            "malaria",
            "Malaria",
            "Малярия",
            "Parasitic infection transmitted by Anopheles mosquitoes",
            &["anopheles-gambiae"],
        ),
        disease_row(
            "west-nile",
            "West Nile fever",
            "Лихорадка Западного Нила",
            "Viral infection carried mainly by Culex mosquitoes",
            &["culex-pipiens"],
        ),
        disease_row(
            "yellow-fever",
            "Yellow fever",
            "Жёлтая лихорадка",
            "Acute viral haemorrhagic disease",
            &["aedes-aegypti"],
        ),
        disease_row(
            "zika",
            "Zika fever",
            "Лихорадка Зика",
            "Viral infection transmitted by Aedes mosquitoes",
            &["aedes-aegypti"],
        ),
    ]
}

fn region_row(id: &str, en: &str, ru: &str, geometry: RegionGeometry) -> Region {
    Region {
        id: id.to_string(),
        names: text(en, Some(ru)),
        geometry,
    }
}

pub fn regions() -> Vec<Region> {
    vec![
        // No species lives here
        region_row(
            "antarctica",
            "Antarctica",
            "Антарктида",
            RegionGeometry::Polygon(vec![rectangle(-180.0, -90.0, 180.0, -60.0)]),
        ),
        // Crosses the antimeridian
        region_row(
            "fiji",
            "Fiji",
            "Фиджи",
            RegionGeometry::Polygon(vec![rectangle(177.0, -19.0, 182.0, -16.0)]),
        ),
        region_row(
            "new-york",
            "New York",
            "Нью-Йорк",
            RegionGeometry::Polygon(vec![rectangle(-74.3, 40.5, -73.7, 40.95)]),
        ),
        region_row(
            "southeast-asia",
            "Southeast Asia",
            "Юго-Восточная Азия",
            RegionGeometry::MultiPolygon(vec![
                vec![rectangle(92.0, 5.0, 110.0, 28.0)],
                vec![rectangle(110.0, -11.0, 141.0, 5.0)],
            ]),
        ),
        // Lake Volta cut out as a hole
        region_row(
            "west-africa",
            "West Africa",
            "Западная Африка",
            RegionGeometry::Polygon(vec![
                rectangle(-17.0, 4.0, 15.0, 20.0),
                rectangle(-1.0, 6.5, 0.5, 8.5),
            ]),
        ),
    ]
}

pub fn facet_labels() -> Vec<FacetLabel> {
    vec![
        FacetLabel {
            facet: FacetKind::VectorStatus,
            value: "vector".to_string(),
            labels: text("Disease vector", Some("Переносчик")),
        },
        FacetLabel {
            facet: FacetKind::VectorStatus,
            value: "non_vector".to_string(),
            labels: text("Not a vector", Some("Не переносчик")),
        },
        FacetLabel {
            facet: FacetKind::Region,
            value: "new-york".to_string(),
            labels: text("New York City", Some("Нью-Йорк")),
        },
    ]
}

pub fn reference_dataset() -> ReferenceDataset {
    ReferenceDataset {
        species: species(),
        diseases: diseases(),
        regions: regions(),
        filter_options: facet_labels(),
    }
}

/// Write the fixture reference tables into `gateway`
pub fn seed_gateway(gateway: &Gateway) -> Result<()> {
    gateway
        .open_table::<Species>(table_names::SPECIES)?
        .insert_many(&species())?;
    gateway
        .open_table::<Disease>(table_names::DISEASES)?
        .insert_many(&diseases())?;
    gateway
        .open_table::<Region>(table_names::REGIONS)?
        .insert_many(&regions())?;
    gateway
        .open_table::<FacetLabel>(table_names::FILTER_OPTIONS)?
        .insert_many(&facet_labels())?;
    Ok(())
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    DynamicImage::ImageRgb8(img)
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut out, format)
        .expect("fixture image encodes");
    out.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}
