//! Test environment management
//!
//! Provides isolated store and image directories with automatic cleanup using RAII.

use anyhow::{Context, Result};
use culicidae_catalog::{Catalog, Predictor, UnavailablePredictor};
use culicidae_core::Config;
use culicidae_storage::Gateway;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::fixtures;

/// Configuration for test environment
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Keep the directory after the test (for debugging)
    pub preserve: bool,
    /// Custom prefix for test directories
    pub prefix: Option<String>,
    /// Pipeline acceptance threshold
    pub confidence_threshold: f32,
    pub predictor_timeout_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            preserve: false,
            prefix: None,
            confidence_threshold: 0.7,
            predictor_timeout_ms: 500,
        }
    }
}

/// Isolated test environment with automatic cleanup
pub struct TestEnvironment {
    temp_dir: Option<TempDir>,
    root_path: PathBuf,
    config: TestConfig,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(config: TestConfig) -> Result<Self> {
        let prefix = config.prefix.as_deref().unwrap_or("culicidae-test");
        let temp_dir = TempDir::with_prefix(prefix)
            .context("Failed to create temporary directory")?;
        let root_path = temp_dir.path().to_path_buf();

        std::fs::create_dir_all(root_path.join("images"))?;
        std::fs::create_dir_all(root_path.join("seeds"))?;

        Ok(Self {
            temp_dir: Some(temp_dir),
            root_path,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root_path.join("store")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root_path.join("images")
    }

    pub fn seeds_dir(&self) -> PathBuf {
        self.root_path.join("seeds")
    }

    /// Catalog configuration pointing at this environment's directories
    pub fn catalog_config(&self) -> Config {
        let mut config = Config::default();
        config.store.path = Some(self.store_dir());
        config.pipeline.image_root = Some(self.images_dir());
        config.pipeline.confidence_threshold = self.config.confidence_threshold;
        config.pipeline.predictor_timeout_ms = self.config.predictor_timeout_ms;
        config
    }

    /// Write the fixture dataset as JSON seed files and return the directory
    pub fn write_seed_files(&self) -> Result<PathBuf> {
        let dataset = fixtures::reference_dataset();
        let dir = self.seeds_dir();
        std::fs::write(dir.join("species.json"), serde_json::to_vec_pretty(&dataset.species)?)?;
        std::fs::write(dir.join("diseases.json"), serde_json::to_vec_pretty(&dataset.diseases)?)?;
        std::fs::write(dir.join("regions.json"), serde_json::to_vec_pretty(&dataset.regions)?)?;
        std::fs::write(
            dir.join("filter_options.json"),
            serde_json::to_vec_pretty(&dataset.filter_options)?,
        )?;
        Ok(dir)
    }

    /// RocksDB-backed catalog seeded with the fixtures and loaded
    pub fn seeded_catalog(&self) -> Result<Catalog> {
        self.seeded_catalog_with(Arc::new(UnavailablePredictor))
    }

    pub fn seeded_catalog_with(&self, predictor: Arc<dyn Predictor>) -> Result<Catalog> {
        let config = self.catalog_config();
        let gateway = Gateway::open(&config.store).context("Failed to open test store")?;
        let catalog = Catalog::with_parts(config, gateway, predictor)?;
        catalog.import(&fixtures::reference_dataset())?;
        Ok(catalog)
    }

    /// Image directories written by the pipeline
    pub fn observation_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(self.images_dir())? {
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    pub fn write_file(&self, path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
        let full_path = self.root_path.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full_path, content)?;
        Ok(())
    }

    /// Manually preserve the environment (for debugging)
    pub fn preserve(&mut self) {
        if let Some(temp_dir) = self.temp_dir.take() {
            let path = temp_dir.keep();
            println!("Test environment preserved at: {}", path.display());
        }
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        if self.config.preserve {
            self.preserve();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creation() {
        let env = TestEnvironment::new().unwrap();
        assert!(env.root().exists());
        assert!(env.images_dir().exists());
        assert!(env.seeds_dir().exists());
        assert_eq!(env.catalog_config().store.path(), env.store_dir());
    }

    #[test]
    fn test_environment_isolation() {
        let env1 = TestEnvironment::new().unwrap();
        let env2 = TestEnvironment::new().unwrap();
        assert_ne!(env1.root(), env2.root());

        env1.write_file("notes/a.txt", b"env1").unwrap();
        assert!(!env2.root().join("notes/a.txt").exists());
    }

    #[test]
    fn test_environment_cleanup() {
        let path = {
            let env = TestEnvironment::new().unwrap();
            env.root().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_seeded_catalog() {
        let env = TestEnvironment::new().unwrap();
        let catalog = env.seeded_catalog().unwrap();
        let stats = catalog.cache().stats().unwrap();
        assert_eq!(stats.species, fixtures::species().len());
        assert!(env.observation_dirs().unwrap().is_empty());

        let seeds = env.write_seed_files().unwrap();
        assert!(seeds.join("filter_options.json").exists());
    }
}
