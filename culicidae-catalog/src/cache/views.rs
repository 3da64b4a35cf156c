/// Locale-resolved read models handed out by the cache
use culicidae_core::{BoundingBox, EntityType, Locale};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesView {
    pub id: String,
    pub scientific_name: String,
    /// Common name in the resolved locale, the scientific name when untranslated
    pub common_name: String,
    pub is_vector: bool,
    pub region_ids: Vec<String>,
    pub disease_ids: Vec<String>,
    pub metadata: serde_json::Value,
    /// Cosine similarity when the view comes from a similarity search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub vector_species_ids: Vec<String>,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionView {
    pub id: String,
    pub name: String,
    /// Valid query envelope; spans -180..180 for outlines crossing the antimeridian
    pub bbox: BoundingBox,
    pub locale: Locale,
}

/// Result of a generic `get` by entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocalizedEntity {
    Species(SpeciesView),
    Disease(DiseaseView),
    Region(RegionView),
}

impl LocalizedEntity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            LocalizedEntity::Species(_) => EntityType::Species,
            LocalizedEntity::Disease(_) => EntityType::Disease,
            LocalizedEntity::Region(_) => EntityType::Region,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            LocalizedEntity::Species(v) => &v.id,
            LocalizedEntity::Disease(v) => &v.id,
            LocalizedEntity::Region(v) => &v.id,
        }
    }
}

/// One selectable filter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetOption {
    pub value: String,
    pub label: String,
    /// Number of species carrying the value
    pub count: usize,
}

/// Filter values derived from the loaded species, labelled for one locale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub locale: Locale,
    pub regions: Vec<FacetOption>,
    pub diseases: Vec<FacetOption>,
    pub vector_status: Vec<FacetOption>,
}
