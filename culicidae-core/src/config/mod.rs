//! Configuration types for culicidae

use crate::types::Locale;
use crate::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory of the embedded table store (defaults to $CULICIDAE_STORE_DIR)
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_write_buffer_size_mb")]
    pub write_buffer_size_mb: usize,
    #[serde(default = "default_block_cache_size_mb")]
    pub block_cache_size_mb: usize,
    /// One of "zstd", "lz4", "snappy", "none"
    #[serde(default = "default_compression")]
    pub compression: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Upper bound on nearest-neighbour candidates before post-filtering
    #[serde(default = "default_similarity_candidates")]
    pub similarity_candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    #[serde(default = "default_allowed_formats")]
    pub allowed_formats: Vec<String>,
    #[serde(default = "default_predictor_timeout_ms")]
    pub predictor_timeout_ms: u64,
    /// Root directory for per-observation image folders (defaults to $CULICIDAE_IMAGES_DIR)
    #[serde(default)]
    pub image_root: Option<PathBuf>,
    #[serde(default = "default_thumbnail_sizes")]
    pub thumbnail_sizes: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PredictorConfig {
    /// HTTP endpoint of the species classifier; unset means prediction is unavailable
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    #[serde(default)]
    pub default: Locale,
}

// Default value functions
fn default_write_buffer_size_mb() -> usize { 64 }
fn default_block_cache_size_mb() -> usize { 256 }
fn default_compression() -> String { "zstd".to_string() }
fn default_limit() -> usize { 50 }
fn default_max_limit() -> usize { 200 }
fn default_similarity_candidates() -> usize { 1000 }
fn default_confidence_threshold() -> f32 { 0.7 }
fn default_max_image_bytes() -> usize { 10 * 1024 * 1024 }
fn default_allowed_formats() -> Vec<String> {
    vec!["jpeg".to_string(), "png".to_string(), "webp".to_string()]
}
fn default_predictor_timeout_ms() -> u64 { 10_000 }
fn default_thumbnail_sizes() -> Vec<u32> { vec![224, 100] }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            write_buffer_size_mb: default_write_buffer_size_mb(),
            block_cache_size_mb: default_block_cache_size_mb(),
            compression: default_compression(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            similarity_candidates: default_similarity_candidates(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_image_bytes: default_max_image_bytes(),
            allowed_formats: default_allowed_formats(),
            predictor_timeout_ms: default_predictor_timeout_ms(),
            image_root: None,
            thumbnail_sizes: default_thumbnail_sizes(),
        }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: Locale::default(),
        }
    }
}

impl PipelineConfig {
    pub fn predictor_timeout(&self) -> Duration {
        Duration::from_millis(self.predictor_timeout_ms)
    }

    pub fn image_root(&self) -> PathBuf {
        self.image_root
            .clone()
            .unwrap_or_else(crate::system::culicidae_images_dir)
    }
}

impl StoreConfig {
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(crate::system::culicidae_store_dir)
    }
}

impl Config {
    /// Reject settings the query engine and pipeline cannot honour
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.query.default_limit == 0 || self.query.max_limit == 0 {
            return Err(CatalogError::Configuration(
                "query limits must be positive".to_string(),
            ));
        }
        if self.query.default_limit > self.query.max_limit {
            return Err(CatalogError::Configuration(format!(
                "default_limit {} exceeds max_limit {}",
                self.query.default_limit, self.query.max_limit
            )));
        }
        if self.query.similarity_candidates == 0 {
            return Err(CatalogError::Configuration(
                "similarity_candidates must be positive".to_string(),
            ));
        }
        if self.pipeline.predictor_timeout_ms == 0 {
            return Err(CatalogError::Configuration(
                "predictor_timeout_ms must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pipeline.confidence_threshold) {
            return Err(CatalogError::Configuration(format!(
                "confidence_threshold {} is outside [0, 1]",
                self.pipeline.confidence_threshold
            )));
        }
        if self.pipeline.max_image_bytes == 0 {
            return Err(CatalogError::Configuration(
                "max_image_bytes must be positive".to_string(),
            ));
        }
        if self.pipeline.thumbnail_sizes.iter().any(|&s| s == 0) {
            return Err(CatalogError::Configuration(
                "thumbnail sizes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, CatalogError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| CatalogError::Configuration(format!("Failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), CatalogError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| CatalogError::Configuration(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
