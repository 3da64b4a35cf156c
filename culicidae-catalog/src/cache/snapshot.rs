/// Immutable, fully indexed copy of the reference tables
use chrono::{DateTime, Utc};
use culicidae_core::{
    BoundingBox, CatalogError, CatalogResult, Disease, FacetKind, FacetLabel, GeoPoint, Locale,
    LocalizedText, Region, Species,
};
use geo::Intersects;
use geo_types::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

use super::views::{DiseaseView, FacetOption, FilterOptions, RegionView, SpeciesView};

/// Region with its outline prepared for containment tests
#[derive(Debug, Clone)]
pub struct CachedRegion {
    pub region: Region,
    shape: MultiPolygon<f64>,
    bbox: BoundingBox,
    crosses_antimeridian: bool,
}

impl CachedRegion {
    fn new(region: Region) -> CatalogResult<Self> {
        let shape = region.geometry.to_multi_polygon().map_err(|e| {
            CatalogError::CacheLoad(format!("region '{}' has invalid geometry: {}", region.id, e))
        })?;
        let bbox = region.geometry.bbox().map_err(|e| {
            CatalogError::CacheLoad(format!("region '{}' has invalid geometry: {}", region.id, e))
        })?;
        let crosses_antimeridian = region.geometry.crosses_antimeridian();
        Ok(Self {
            region,
            shape,
            bbox,
            crosses_antimeridian,
        })
    }

    /// Inclusive point-in-polygon test: points on an exterior ring or on a
    /// hole's ring count as contained. Outlines drawn past ±180 are matched by
    /// also testing the point shifted by a full turn.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let hit = |lon: f64| self.shape.intersects(&Point::new(lon, point.latitude));
        if hit(point.longitude) {
            return true;
        }
        self.crosses_antimeridian
            && (hit(point.longitude + 360.0) || hit(point.longitude - 360.0))
    }

    /// Envelope of the outline, unnormalised
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Envelope usable against stored observation coordinates. Outlines that
    /// cross the antimeridian span the full longitude range.
    pub fn search_window(&self) -> BoundingBox {
        if self.crosses_antimeridian {
            BoundingBox {
                min_lon: -180.0,
                max_lon: 180.0,
                ..self.bbox
            }
        } else {
            self.bbox
        }
    }
}

/// Counters describing a loaded snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub species: usize,
    pub diseases: usize,
    pub regions: usize,
    pub facet_labels: usize,
    pub embedding_dim: Option<usize>,
    pub loaded_at: DateTime<Utc>,
}

pub struct CacheSnapshot {
    default_locale: Locale,
    species: HashMap<String, Species>,
    /// Species ids ordered by scientific name, then id
    species_order: Vec<String>,
    /// Lowercased scientific and common names per species
    search_text: HashMap<String, Vec<String>>,
    /// Disease ids linked to each species from either side of the relation
    species_diseases: HashMap<String, BTreeSet<String>>,
    /// Known region ids referenced by each species
    species_regions: HashMap<String, BTreeSet<String>>,
    diseases: BTreeMap<String, Disease>,
    regions: BTreeMap<String, CachedRegion>,
    facet_labels: HashMap<(FacetKind, String), LocalizedText>,
    facet_counts: BTreeMap<FacetKind, BTreeMap<String, usize>>,
    embedding_dim: Option<usize>,
    loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for CacheSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSnapshot")
            .field("species", &self.species.len())
            .field("diseases", &self.diseases.len())
            .field("regions", &self.regions.len())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

fn insert_unique<T>(
    map: &mut impl Extend<(String, T)>,
    seen: &mut BTreeSet<String>,
    table: &str,
    id: String,
    value: T,
) -> CatalogResult<()> {
    if !seen.insert(id.clone()) {
        return Err(CatalogError::CacheLoad(format!(
            "duplicate id '{}' in table '{}'",
            id, table
        )));
    }
    map.extend(std::iter::once((id, value)));
    Ok(())
}

impl CacheSnapshot {
    /// Index the reference rows. Fails on duplicate ids, inconsistent
    /// embedding lengths or unusable region outlines.
    pub fn build(
        default_locale: Locale,
        species_rows: Vec<Species>,
        disease_rows: Vec<Disease>,
        region_rows: Vec<Region>,
        label_rows: Vec<FacetLabel>,
    ) -> CatalogResult<Self> {
        let mut seen = BTreeSet::new();
        let mut species = HashMap::with_capacity(species_rows.len());
        let mut embedding_dim: Option<usize> = None;
        for row in species_rows {
            if !row.vector_embedding.is_empty() {
                let dim = row.vector_embedding.len();
                match embedding_dim {
                    None => embedding_dim = Some(dim),
                    Some(expected) if expected != dim => {
                        return Err(CatalogError::CacheLoad(format!(
                            "species '{}' has a {}-dimensional embedding, expected {}",
                            row.id, dim, expected
                        )));
                    }
                    Some(_) => {}
                }
            }
            insert_unique(&mut species, &mut seen, "species", row.id.clone(), row)?;
        }

        let mut seen = BTreeSet::new();
        let mut diseases = BTreeMap::new();
        for row in disease_rows {
            insert_unique(&mut diseases, &mut seen, "diseases", row.id.clone(), row)?;
        }

        let mut seen = BTreeSet::new();
        let mut regions = BTreeMap::new();
        for row in region_rows {
            let id = row.id.clone();
            insert_unique(&mut regions, &mut seen, "regions", id, CachedRegion::new(row)?)?;
        }

        let mut seen = BTreeSet::new();
        let mut facet_labels = HashMap::new();
        for row in label_rows {
            if !seen.insert(row.key()) {
                return Err(CatalogError::CacheLoad(format!(
                    "duplicate id '{}' in table 'filter_options'",
                    row.key()
                )));
            }
            facet_labels.insert((row.facet, row.value), row.labels);
        }

        let mut species_diseases: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut species_regions: HashMap<String, BTreeSet<String>> = HashMap::new();
        for s in species.values() {
            let diseases_of = species_diseases.entry(s.id.clone()).or_default();
            for disease_id in &s.disease_ids {
                if diseases.contains_key(disease_id) {
                    diseases_of.insert(disease_id.clone());
                } else {
                    warn!(species = %s.id, disease = %disease_id, "species references unknown disease");
                }
            }
            let regions_of = species_regions.entry(s.id.clone()).or_default();
            for region_id in &s.region_ids {
                if regions.contains_key(region_id) {
                    regions_of.insert(region_id.clone());
                } else {
                    warn!(species = %s.id, region = %region_id, "species references unknown region");
                }
            }
        }
        for d in diseases.values() {
            for species_id in &d.vector_species_ids {
                match species_diseases.get_mut(species_id) {
                    Some(set) => {
                        set.insert(d.id.clone());
                    }
                    None => {
                        warn!(disease = %d.id, species = %species_id, "disease references unknown vector species")
                    }
                }
            }
        }

        let mut facet_counts: BTreeMap<FacetKind, BTreeMap<String, usize>> = BTreeMap::new();
        for s in species.values() {
            if let Some(set) = species_regions.get(&s.id) {
                for region_id in set {
                    *facet_counts
                        .entry(FacetKind::Region)
                        .or_default()
                        .entry(region_id.clone())
                        .or_default() += 1;
                }
            }
            if let Some(set) = species_diseases.get(&s.id) {
                for disease_id in set {
                    *facet_counts
                        .entry(FacetKind::Disease)
                        .or_default()
                        .entry(disease_id.clone())
                        .or_default() += 1;
                }
            }
            *facet_counts
                .entry(FacetKind::VectorStatus)
                .or_default()
                .entry(FacetKind::vector_status_value(s.is_vector).to_string())
                .or_default() += 1;
        }

        let mut species_order: Vec<&Species> = species.values().collect();
        species_order.sort_by(|a, b| {
            a.scientific_name
                .cmp(&b.scientific_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        let species_order: Vec<String> = species_order.into_iter().map(|s| s.id.clone()).collect();

        let search_text = species
            .values()
            .map(|s| {
                let mut names = vec![s.scientific_name.to_lowercase()];
                names.extend(s.common_names.values().map(str::to_lowercase));
                (s.id.clone(), names)
            })
            .collect();

        Ok(Self {
            default_locale,
            species,
            species_order,
            search_text,
            species_diseases,
            species_regions,
            diseases,
            regions,
            facet_labels,
            facet_counts,
            embedding_dim,
            loaded_at: Utc::now(),
        })
    }

    pub fn default_locale(&self) -> Locale {
        self.default_locale
    }

    /// Resolve a caller-supplied language tag; unsupported tags use the default locale
    pub fn resolve_locale(&self, tag: Option<&str>) -> Locale {
        Locale::resolve(tag, self.default_locale)
    }

    pub fn embedding_dim(&self) -> Option<usize> {
        self.embedding_dim
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn species_record(&self, id: &str) -> Option<&Species> {
        self.species.get(id)
    }

    pub fn disease_record(&self, id: &str) -> Option<&Disease> {
        self.diseases.get(id)
    }

    pub fn region_record(&self, id: &str) -> Option<&CachedRegion> {
        self.regions.get(id)
    }

    /// Species in default listing order
    pub fn species_in_order(&self) -> impl Iterator<Item = &Species> {
        self.species_order.iter().filter_map(|id| self.species.get(id))
    }

    pub fn diseases(&self) -> impl Iterator<Item = &Disease> {
        self.diseases.values()
    }

    pub fn regions(&self) -> impl Iterator<Item = &CachedRegion> {
        self.regions.values()
    }

    /// Case-insensitive substring match over scientific and common names.
    /// `needle` must already be lowercased.
    pub fn species_matches_term(&self, species_id: &str, needle: &str) -> bool {
        self.search_text
            .get(species_id)
            .is_some_and(|names| names.iter().any(|n| n.contains(needle)))
    }

    pub fn species_in_region(&self, species_id: &str, region_id: &str) -> bool {
        self.species_regions
            .get(species_id)
            .is_some_and(|set| set.contains(region_id))
    }

    pub fn species_carries_disease(&self, species_id: &str, disease_id: &str) -> bool {
        self.species_diseases
            .get(species_id)
            .is_some_and(|set| set.contains(disease_id))
    }

    /// Whether a facet value is present in the derived filter options
    pub fn has_facet(&self, kind: FacetKind, value: &str) -> bool {
        self.facet_counts
            .get(&kind)
            .is_some_and(|values| values.contains_key(value))
    }

    pub fn species_view(&self, species: &Species, locale: Locale) -> SpeciesView {
        SpeciesView {
            id: species.id.clone(),
            scientific_name: species.scientific_name.clone(),
            common_name: species
                .common_names
                .resolve(locale, self.default_locale, &species.scientific_name)
                .to_string(),
            is_vector: species.is_vector,
            region_ids: species.region_ids.clone(),
            disease_ids: species.disease_ids.clone(),
            metadata: species.metadata.clone(),
            similarity: None,
            locale,
        }
    }

    pub fn disease_view(&self, disease: &Disease, locale: Locale) -> DiseaseView {
        let description = disease
            .descriptions
            .resolve(locale, self.default_locale, "")
            .to_string();
        DiseaseView {
            id: disease.id.clone(),
            name: disease
                .names
                .resolve(locale, self.default_locale, &disease.id)
                .to_string(),
            description: (!description.is_empty()).then_some(description),
            vector_species_ids: disease.vector_species_ids.clone(),
            locale,
        }
    }

    pub fn region_view(&self, region: &CachedRegion, locale: Locale) -> RegionView {
        RegionView {
            id: region.region.id.clone(),
            name: region
                .region
                .names
                .resolve(locale, self.default_locale, &region.region.id)
                .to_string(),
            bbox: region.search_window(),
            locale,
        }
    }

    /// Diseases linked to a species, ordered by id
    pub fn diseases_for_species(&self, species_id: &str) -> Option<Vec<&Disease>> {
        let ids = self.species_diseases.get(species_id)?;
        Some(ids.iter().filter_map(|id| self.diseases.get(id)).collect())
    }

    /// Vector species of a disease in default listing order
    pub fn vectors_for_disease(&self, disease_id: &str) -> Option<Vec<&Species>> {
        self.diseases.get(disease_id)?;
        Some(
            self.species_in_order()
                .filter(|s| self.species_carries_disease(&s.id, disease_id))
                .collect(),
        )
    }

    /// Regions whose outline contains the point, ordered by id
    pub fn regions_containing(&self, point: &GeoPoint) -> Vec<&CachedRegion> {
        self.regions
            .values()
            .filter(|region| region.contains(point))
            .collect()
    }

    fn facet_label(&self, kind: FacetKind, value: &str, locale: Locale) -> String {
        let entity_name = match kind {
            FacetKind::Region => self
                .regions
                .get(value)
                .map(|r| r.region.names.resolve(locale, self.default_locale, value)),
            FacetKind::Disease => self
                .diseases
                .get(value)
                .map(|d| d.names.resolve(locale, self.default_locale, value)),
            FacetKind::VectorStatus => None,
        }
        .unwrap_or(value);

        match self.facet_labels.get(&(kind, value.to_string())) {
            Some(labels) => labels
                .resolve(locale, self.default_locale, entity_name)
                .to_string(),
            None => entity_name.to_string(),
        }
    }

    fn facet_options(&self, kind: FacetKind, locale: Locale) -> Vec<FacetOption> {
        self.facet_counts
            .get(&kind)
            .map(|values| {
                values
                    .iter()
                    .map(|(value, count)| FacetOption {
                        value: value.clone(),
                        label: self.facet_label(kind, value, locale),
                        count: *count,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn filter_options(&self, locale: Locale) -> FilterOptions {
        FilterOptions {
            locale,
            regions: self.facet_options(FacetKind::Region, locale),
            diseases: self.facet_options(FacetKind::Disease, locale),
            vector_status: self.facet_options(FacetKind::VectorStatus, locale),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            species: self.species.len(),
            diseases: self.diseases.len(),
            regions: self.regions.len(),
            facet_labels: self.facet_labels.len(),
            embedding_dim: self.embedding_dim,
            loaded_at: self.loaded_at,
        }
    }
}
