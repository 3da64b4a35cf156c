//! Filter and query engine over the reference cache
//!
//! Text and categorical filters run against the published cache snapshot.
//! Similarity queries rank species through the gateway's nearest-neighbour
//! scan and then apply the same filters without disturbing rank order.

pub mod pagination;

pub use pagination::{Page, PageCursor, Pagination};

use crate::cache::{CacheSnapshot, DiseaseView, ReferenceCache, RegionView, SpeciesView};
use culicidae_core::config::QueryConfig;
use culicidae_core::{CatalogError, CatalogResult, EntityType, FacetKind, Species};
use culicidae_storage::{table_names, Gateway};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Species search parameters. Every filter is optional and filters combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeciesQuery {
    /// Case-insensitive substring of the scientific or any common name
    pub term: Option<String>,
    pub region_id: Option<String>,
    pub disease_id: Option<String>,
    pub is_vector: Option<bool>,
    /// Language tag; unsupported tags fall back to the default locale
    pub locale: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Rank by similarity to this embedding instead of by name
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiseaseQuery {
    pub term: Option<String>,
    /// Only diseases transmitted by this species
    pub vector_species_id: Option<String>,
    pub locale: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionQuery {
    pub term: Option<String>,
    pub locale: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Lowercased, blank-stripped search term
fn normalize_term(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Categorical and text predicates of a species query
struct SpeciesFilter<'q> {
    needle: Option<String>,
    region_id: Option<&'q str>,
    disease_id: Option<&'q str>,
    is_vector: Option<bool>,
}

impl<'q> SpeciesFilter<'q> {
    fn from_query(query: &'q SpeciesQuery) -> Self {
        Self {
            needle: normalize_term(query.term.as_deref()),
            region_id: query.region_id.as_deref(),
            disease_id: query.disease_id.as_deref(),
            is_vector: query.is_vector,
        }
    }

    /// False when a filter names a value absent from the facet set
    fn facets_known(&self, snapshot: &CacheSnapshot) -> bool {
        self.region_id
            .is_none_or(|id| snapshot.has_facet(FacetKind::Region, id))
            && self
                .disease_id
                .is_none_or(|id| snapshot.has_facet(FacetKind::Disease, id))
            && self.is_vector.is_none_or(|flag| {
                snapshot.has_facet(FacetKind::VectorStatus, FacetKind::vector_status_value(flag))
            })
    }

    fn matches(&self, snapshot: &CacheSnapshot, species: &Species) -> bool {
        self.is_vector.is_none_or(|flag| species.is_vector == flag)
            && self
                .region_id
                .is_none_or(|id| snapshot.species_in_region(&species.id, id))
            && self
                .disease_id
                .is_none_or(|id| snapshot.species_carries_disease(&species.id, id))
            && self
                .needle
                .as_deref()
                .is_none_or(|needle| snapshot.species_matches_term(&species.id, needle))
    }
}

pub struct QueryEngine {
    cache: Arc<ReferenceCache>,
    gateway: Gateway,
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(cache: Arc<ReferenceCache>, gateway: Gateway, config: QueryConfig) -> Self {
        Self {
            cache,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn search_species(&self, query: &SpeciesQuery) -> CatalogResult<Page<SpeciesView>> {
        let snapshot = self.cache.snapshot()?;
        let locale = snapshot.resolve_locale(query.locale.as_deref());
        let pagination = Pagination::new(query.limit, query.offset, &self.config);
        let filter = SpeciesFilter::from_query(query);

        if !filter.facets_known(&snapshot) {
            debug!(
                region = ?query.region_id,
                disease = ?query.disease_id,
                vector = ?query.is_vector,
                "unknown facet value"
            );
            return Ok(Page::empty(pagination));
        }

        let views = match query.embedding.as_deref() {
            Some(embedding) => self.rank_by_similarity(&snapshot, embedding, &filter, None)?,
            None => snapshot
                .species_in_order()
                .filter(|s| filter.matches(&snapshot, s))
                .map(|s| (s, None))
                .collect(),
        }
        .into_iter()
        .map(|(species, score)| {
            let mut view = snapshot.species_view(species, locale);
            view.similarity = score;
            view
        })
        .collect::<Vec<_>>();

        debug!(matches = views.len(), locale = %locale, "species query");
        Ok(pagination.apply(views))
    }

    /// Species most similar to an existing one, excluding itself
    pub fn similar_species(
        &self,
        species_id: &str,
        query: &SpeciesQuery,
    ) -> CatalogResult<Page<SpeciesView>> {
        let snapshot = self.cache.snapshot()?;
        let species = snapshot
            .species_record(species_id)
            .ok_or_else(|| CatalogError::not_found(EntityType::Species.as_str(), species_id))?;
        if species.vector_embedding.is_empty() {
            return Err(CatalogError::validation(format!(
                "species '{}' has no embedding",
                species_id
            )));
        }

        let locale = snapshot.resolve_locale(query.locale.as_deref());
        let pagination = Pagination::new(query.limit, query.offset, &self.config);
        let filter = SpeciesFilter::from_query(query);
        if !filter.facets_known(&snapshot) {
            return Ok(Page::empty(pagination));
        }

        let views = self
            .rank_by_similarity(&snapshot, &species.vector_embedding, &filter, Some(species_id))?
            .into_iter()
            .map(|(s, score)| {
                let mut view = snapshot.species_view(s, locale);
                view.similarity = score;
                view
            })
            .collect();
        Ok(pagination.apply(views))
    }

    fn rank_by_similarity<'s>(
        &self,
        snapshot: &'s CacheSnapshot,
        embedding: &[f32],
        filter: &SpeciesFilter<'_>,
        exclude: Option<&str>,
    ) -> CatalogResult<Vec<(&'s Species, Option<f32>)>> {
        match snapshot.embedding_dim() {
            None => {
                return Err(CatalogError::validation(
                    "similarity search unavailable: no species embeddings are loaded",
                ))
            }
            Some(dim) if dim != embedding.len() => {
                return Err(CatalogError::validation(format!(
                    "query embedding has {} dimensions, catalog embeddings have {}",
                    embedding.len(),
                    dim
                )))
            }
            Some(_) => {}
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(CatalogError::validation(
                "query embedding contains non-finite values",
            ));
        }
        if embedding.iter().all(|v| *v == 0.0) {
            return Err(CatalogError::validation("query embedding has zero norm"));
        }

        let neighbors = self
            .gateway
            .get_table::<Species>(table_names::SPECIES)?
            .nearest(embedding, self.config.similarity_candidates)?;

        // Rows written after the snapshot was published are skipped
        Ok(neighbors
            .into_iter()
            .filter(|n| exclude != Some(n.record.id.as_str()))
            .filter_map(|n| {
                snapshot
                    .species_record(&n.record.id)
                    .map(|species| (species, Some(n.score)))
            })
            .filter(|(species, _)| filter.matches(snapshot, species))
            .collect())
    }

    pub fn search_diseases(&self, query: &DiseaseQuery) -> CatalogResult<Page<DiseaseView>> {
        let snapshot = self.cache.snapshot()?;
        let locale = snapshot.resolve_locale(query.locale.as_deref());
        let pagination = Pagination::new(query.limit, query.offset, &self.config);
        let needle = normalize_term(query.term.as_deref());

        if let Some(species_id) = query.vector_species_id.as_deref() {
            if snapshot.species_record(species_id).is_none() {
                return Ok(Page::empty(pagination));
            }
        }

        let mut views: Vec<DiseaseView> = snapshot
            .diseases()
            .filter(|d| {
                query
                    .vector_species_id
                    .as_deref()
                    .is_none_or(|s| snapshot.species_carries_disease(s, &d.id))
            })
            .filter(|d| {
                needle.as_deref().is_none_or(|needle| {
                    d.names.values().any(|n| n.to_lowercase().contains(needle))
                })
            })
            .map(|d| snapshot.disease_view(d, locale))
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(pagination.apply(views))
    }

    pub fn search_regions(&self, query: &RegionQuery) -> CatalogResult<Page<RegionView>> {
        let snapshot = self.cache.snapshot()?;
        let locale = snapshot.resolve_locale(query.locale.as_deref());
        let pagination = Pagination::new(query.limit, query.offset, &self.config);
        let needle = normalize_term(query.term.as_deref());

        let mut views: Vec<RegionView> = snapshot
            .regions()
            .filter(|r| {
                needle.as_deref().is_none_or(|needle| {
                    r.region
                        .names
                        .values()
                        .any(|n| n.to_lowercase().contains(needle))
                })
            })
            .map(|r| snapshot.region_view(r, locale))
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(pagination.apply(views))
    }
}
