//! Catalog entity types shared by the storage, cache and pipeline layers

pub mod entity;
pub mod facets;
pub mod geo;
pub mod locale;
pub mod observation;

pub use entity::{Disease, EntityType, Region, RegionGeometry, Species};
pub use facets::{FacetKind, FacetLabel, VECTOR_STATUS_NON_VECTOR, VECTOR_STATUS_VECTOR};
pub use geo::{BoundingBox, GeoPoint};
pub use locale::{Locale, LocalizedText};
pub use observation::{Observation, PredictionStatus, SpeciesCandidate};
