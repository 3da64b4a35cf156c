pub mod diseases;
pub mod facets;
pub mod import;
pub mod observations;
pub mod observe;
pub mod paths;
pub mod regions;
pub mod species;

use anyhow::Result;
use culicidae_catalog::Catalog;
use culicidae_core::Config;

/// Open the store and load the reference cache
pub fn open_catalog(config: Config) -> Result<Catalog> {
    Ok(Catalog::open_loaded(config)?)
}

/// Runtime for commands that drive the async pipeline
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
