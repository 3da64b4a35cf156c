//! Core types and utilities shared across the culicidae crates

pub mod config;
pub mod error;
pub mod logging;
pub mod system;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, save_config, Config};
pub use error::{CatalogError, CatalogResult, ErrorKind, ErrorReport};

// Re-export core types
pub use types::{
    BoundingBox, Disease, EntityType, FacetKind, FacetLabel, GeoPoint, Locale, LocalizedText,
    Observation, PredictionStatus, Region, RegionGeometry, Species, SpeciesCandidate,
};

// Re-export system utilities
pub use system::{
    culicidae_data_dir, culicidae_home, culicidae_images_dir, culicidae_store_dir,
    describe_paths,
};

/// Version information for the culicidae project
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
