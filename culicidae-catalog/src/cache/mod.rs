//! Reference data cache
//!
//! The cache reads the `species`, `diseases`, `regions` and `filter_options`
//! tables once, indexes them into a [`CacheSnapshot`] and publishes the
//! snapshot with a single pointer swap. Readers clone the `Arc` and never
//! observe a half-built snapshot; a failed load keeps the previous one.

pub mod snapshot;
pub mod views;

pub use snapshot::{CacheSnapshot, CacheStats, CachedRegion};
pub use views::{
    DiseaseView, FacetOption, FilterOptions, LocalizedEntity, RegionView, SpeciesView,
};

use culicidae_core::{
    CatalogError, CatalogResult, Disease, EntityType, FacetLabel, Locale, Region, Species,
};
use culicidae_storage::{table_names, Gateway, Record};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{error, info};

pub struct ReferenceCache {
    default_locale: Locale,
    current: RwLock<Option<Arc<CacheSnapshot>>>,
}

fn read_table<T: Record>(gateway: &Gateway, name: &str) -> CatalogResult<Vec<T>> {
    let table = gateway.get_table::<T>(name).map_err(|e| {
        CatalogError::CacheLoad(format!("required table '{}' is unavailable: {}", name, e))
    })?;
    table
        .scan()
        .map_err(|e| CatalogError::CacheLoad(e.to_string()))
}

impl ReferenceCache {
    pub fn new(default_locale: Locale) -> Self {
        Self {
            default_locale,
            current: RwLock::new(None),
        }
    }

    /// Build a fresh snapshot from the gateway and publish it
    pub fn load(&self, gateway: &Gateway) -> CatalogResult<CacheStats> {
        let result = read_table::<Species>(gateway, table_names::SPECIES).and_then(|species| {
            CacheSnapshot::build(
                self.default_locale,
                species,
                read_table::<Disease>(gateway, table_names::DISEASES)?,
                read_table::<Region>(gateway, table_names::REGIONS)?,
                read_table::<FacetLabel>(gateway, table_names::FILTER_OPTIONS)?,
            )
        });

        match result {
            Ok(snapshot) => Ok(self.publish(snapshot)),
            Err(e) => {
                error!(error = %e, "reference cache load failed");
                Err(e)
            }
        }
    }

    /// Publish an already validated snapshot
    pub fn publish(&self, snapshot: CacheSnapshot) -> CacheStats {
        let snapshot = Arc::new(snapshot);
        let stats = snapshot.stats();
        *self.current.write() = Some(snapshot);
        info!(
            species = stats.species,
            diseases = stats.diseases,
            regions = stats.regions,
            "reference cache published"
        );
        stats
    }

    pub fn ready(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn default_locale(&self) -> Locale {
        self.default_locale
    }

    /// The published snapshot. Fails until the first successful load.
    pub fn snapshot(&self) -> CatalogResult<Arc<CacheSnapshot>> {
        self.current
            .read()
            .clone()
            .ok_or_else(|| CatalogError::CacheLoad("cache not loaded".to_string()))
    }

    pub fn stats(&self) -> CatalogResult<CacheStats> {
        Ok(self.snapshot()?.stats())
    }

    /// Look up any reference entity with text resolved for `locale`
    pub fn get(
        &self,
        entity_type: EntityType,
        id: &str,
        locale: Option<&str>,
    ) -> CatalogResult<LocalizedEntity> {
        Ok(match entity_type {
            EntityType::Species => LocalizedEntity::Species(self.species(id, locale)?),
            EntityType::Disease => LocalizedEntity::Disease(self.disease(id, locale)?),
            EntityType::Region => LocalizedEntity::Region(self.region(id, locale)?),
        })
    }

    pub fn species(&self, id: &str, locale: Option<&str>) -> CatalogResult<SpeciesView> {
        let snapshot = self.snapshot()?;
        let locale = snapshot.resolve_locale(locale);
        snapshot
            .species_record(id)
            .map(|s| snapshot.species_view(s, locale))
            .ok_or_else(|| CatalogError::not_found(EntityType::Species.as_str(), id))
    }

    pub fn disease(&self, id: &str, locale: Option<&str>) -> CatalogResult<DiseaseView> {
        let snapshot = self.snapshot()?;
        let locale = snapshot.resolve_locale(locale);
        snapshot
            .disease_record(id)
            .map(|d| snapshot.disease_view(d, locale))
            .ok_or_else(|| CatalogError::not_found(EntityType::Disease.as_str(), id))
    }

    pub fn region(&self, id: &str, locale: Option<&str>) -> CatalogResult<RegionView> {
        let snapshot = self.snapshot()?;
        let locale = snapshot.resolve_locale(locale);
        snapshot
            .region_record(id)
            .map(|r| snapshot.region_view(r, locale))
            .ok_or_else(|| CatalogError::not_found(EntityType::Region.as_str(), id))
    }

    pub fn diseases_for_species(
        &self,
        species_id: &str,
        locale: Option<&str>,
    ) -> CatalogResult<Vec<DiseaseView>> {
        let snapshot = self.snapshot()?;
        let locale = snapshot.resolve_locale(locale);
        let diseases = snapshot
            .diseases_for_species(species_id)
            .ok_or_else(|| CatalogError::not_found(EntityType::Species.as_str(), species_id))?;
        Ok(diseases
            .into_iter()
            .map(|d| snapshot.disease_view(d, locale))
            .collect())
    }

    pub fn vectors_for_disease(
        &self,
        disease_id: &str,
        locale: Option<&str>,
    ) -> CatalogResult<Vec<SpeciesView>> {
        let snapshot = self.snapshot()?;
        let locale = snapshot.resolve_locale(locale);
        let species = snapshot
            .vectors_for_disease(disease_id)
            .ok_or_else(|| CatalogError::not_found(EntityType::Disease.as_str(), disease_id))?;
        Ok(species
            .into_iter()
            .map(|s| snapshot.species_view(s, locale))
            .collect())
    }

    /// Filter values with labels in the requested locale
    pub fn list_facets(&self, locale: Option<&str>) -> CatalogResult<FilterOptions> {
        let snapshot = self.snapshot()?;
        let locale = snapshot.resolve_locale(locale);
        Ok(snapshot.filter_options(locale))
    }
}
