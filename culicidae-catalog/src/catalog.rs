//! Catalog facade wiring the store, cache, query engines and pipeline together

use crate::cache::{CacheSnapshot, CacheStats, ReferenceCache};
use crate::geo::GeoQueryService;
use crate::pipeline::ObservationPipeline;
use crate::predictor::{Predictor, RemotePredictor, UnavailablePredictor};
use crate::query::QueryEngine;
use culicidae_core::{
    CatalogError, CatalogResult, Config, Disease, FacetLabel, Locale, Region, Species,
};
use culicidae_storage::{table_names, Gateway, Record};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Reference rows as shipped in a seed directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceDataset {
    pub species: Vec<Species>,
    pub diseases: Vec<Disease>,
    pub regions: Vec<Region>,
    #[serde(default)]
    pub filter_options: Vec<FacetLabel>,
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> CatalogResult<Vec<T>> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        CatalogError::Serialization(format!("{}: {}", path.display(), e))
    })
}

impl ReferenceDataset {
    /// Read `species.json`, `diseases.json`, `regions.json` and, if present,
    /// `filter_options.json` from `dir`
    pub fn from_dir(dir: &Path) -> CatalogResult<Self> {
        let labels = dir.join("filter_options.json");
        let filter_options = if labels.exists() {
            read_rows(&labels)?
        } else {
            Vec::new()
        };

        Ok(Self {
            species: read_rows(&dir.join("species.json"))?,
            diseases: read_rows(&dir.join("diseases.json"))?,
            regions: read_rows(&dir.join("regions.json"))?,
            filter_options,
        })
    }

    /// Index the rows without touching any store. Rejects duplicate ids,
    /// mixed embedding lengths and unusable region outlines.
    pub fn snapshot(&self, default_locale: Locale) -> CatalogResult<CacheSnapshot> {
        CacheSnapshot::build(
            default_locale,
            self.species.clone(),
            self.diseases.clone(),
            self.regions.clone(),
            self.filter_options.clone(),
        )
    }

    /// Replace each reference table with this dataset's rows, creating the
    /// tables as needed. Rows whose ids are not in the dataset are removed.
    pub fn write_to(&self, gateway: &Gateway) -> CatalogResult<()> {
        write_table(gateway, table_names::SPECIES, &self.species)?;
        write_table(gateway, table_names::DISEASES, &self.diseases)?;
        write_table(gateway, table_names::REGIONS, &self.regions)?;
        write_table(gateway, table_names::FILTER_OPTIONS, &self.filter_options)?;
        gateway.flush()?;
        Ok(())
    }
}

fn write_table<T: Record>(gateway: &Gateway, name: &str, rows: &[T]) -> CatalogResult<()> {
    let table = gateway.open_table::<T>(name)?;
    table.replace_all(rows)?;
    debug!(table = name, rows = rows.len(), "replaced table rows");
    Ok(())
}

fn build_predictor(config: &Config) -> CatalogResult<Arc<dyn Predictor>> {
    match config.predictor.endpoint.as_deref() {
        Some(endpoint) => {
            let predictor = RemotePredictor::new(endpoint, config.pipeline.predictor_timeout())
                .map_err(|e| CatalogError::Configuration(e.to_string()))?;
            Ok(Arc::new(predictor))
        }
        None => Ok(Arc::new(UnavailablePredictor)),
    }
}

pub struct Catalog {
    config: Config,
    gateway: Gateway,
    cache: Arc<ReferenceCache>,
    query: QueryEngine,
    geo: GeoQueryService,
    pipeline: ObservationPipeline,
}

impl Catalog {
    /// Open the configured store. The cache stays empty until [`Catalog::load`].
    pub fn open(config: Config) -> CatalogResult<Self> {
        config.validate()?;
        let gateway = Gateway::open(&config.store)
            .map_err(|e| CatalogError::StoreUnavailable(e.to_string()))?;
        let predictor = build_predictor(&config)?;
        Self::with_parts(config, gateway, predictor)
    }

    /// Open the store and load the reference cache
    pub fn open_loaded(config: Config) -> CatalogResult<Self> {
        let catalog = Self::open(config)?;
        catalog.load()?;
        Ok(catalog)
    }

    pub fn with_parts(
        config: Config,
        gateway: Gateway,
        predictor: Arc<dyn Predictor>,
    ) -> CatalogResult<Self> {
        config.validate()?;
        let cache = Arc::new(ReferenceCache::new(config.locale.default));
        let query = QueryEngine::new(Arc::clone(&cache), gateway.clone(), config.query.clone());
        let geo = GeoQueryService::new(Arc::clone(&cache), gateway.clone());
        let pipeline = ObservationPipeline::new(
            Arc::clone(&cache),
            gateway.clone(),
            predictor,
            config.pipeline.clone(),
            config.query.clone(),
        );

        Ok(Self {
            config,
            gateway,
            cache,
            query,
            geo,
            pipeline,
        })
    }

    /// Rebuild the reference cache from the store
    pub fn load(&self) -> CatalogResult<CacheStats> {
        self.cache.load(&self.gateway)
    }

    /// Validate a seed dataset, then persist it and publish it to the cache.
    /// A dataset that fails validation leaves the store and cache untouched.
    pub fn import(&self, dataset: &ReferenceDataset) -> CatalogResult<CacheStats> {
        let snapshot = dataset.snapshot(self.cache.default_locale())?;
        dataset.write_to(&self.gateway)?;
        let stats = self.cache.publish(snapshot);
        info!(
            species = stats.species,
            diseases = stats.diseases,
            regions = stats.regions,
            "reference data imported"
        );
        Ok(stats)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn cache(&self) -> &Arc<ReferenceCache> {
        &self.cache
    }

    pub fn query(&self) -> &QueryEngine {
        &self.query
    }

    pub fn geo(&self) -> &GeoQueryService {
        &self.geo
    }

    pub fn pipeline(&self) -> &ObservationPipeline {
        &self.pipeline
    }
}
