//! Reference data cache, query engines and observation pipeline for the
//! culicidae mosquito catalog

pub mod cache;
pub mod catalog;
pub mod geo;
pub mod pipeline;
pub mod predictor;
pub mod query;

pub use cache::{
    CacheSnapshot, CacheStats, DiseaseView, FacetOption, FilterOptions, LocalizedEntity,
    ReferenceCache, RegionView, SpeciesView,
};
pub use catalog::{Catalog, ReferenceDataset};
pub use geo::GeoQueryService;
pub use pipeline::{
    ImageArtifacts, ImageKind, ObservationOutcome, ObservationPipeline, ObservationQuery,
    ObservationSubmission, ObservationUpdate,
};
pub use predictor::{Prediction, Predictor, PredictorError, RemotePredictor, UnavailablePredictor};
pub use query::{
    DiseaseQuery, Page, PageCursor, Pagination, QueryEngine, RegionQuery, SpeciesQuery,
};
