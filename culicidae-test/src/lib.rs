//! Test utilities for the culicidae workspace
//!
//! Shared fixtures, isolated on-disk environments and mock implementations of
//! the predictor and table store seams.
//!
//! # Features
//!
//! - **Test Environment**: temporary store and image directories with automatic cleanup
//! - **Fixtures**: reference species, diseases, regions and encoded images
//! - **Mock Implementations**: scripted predictors and a failing table store

pub mod environment;
pub mod fixtures;
pub mod mock;

// Re-export commonly used items
pub use environment::{TestConfig, TestEnvironment};
pub use fixtures::{jpeg_bytes, png_bytes, reference_dataset, seed_gateway};
pub use mock::{FailingPredictor, FailingTableStore, SlowPredictor, StaticPredictor};

// Re-export test dependencies for convenience
pub use anyhow::{Context, Result};
pub use tempfile;

/// Initialize test logging (call once per test module)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(culicidae_core::logging::env_filter("warn"))
        .with_test_writer()
        .try_init();
}

/// Run a test with a clean environment
///
/// # Example
/// ```rust
/// use culicidae_test::with_test_env;
///
/// with_test_env(|env| {
///     let catalog = env.seeded_catalog()?;
///     assert!(catalog.cache().ready());
///     Ok(())
/// })
/// .unwrap();
/// ```
pub fn with_test_env<F, R>(f: F) -> Result<R>
where
    F: FnOnce(&TestEnvironment) -> Result<R>,
{
    let env = TestEnvironment::new()?;
    f(&env)
}
