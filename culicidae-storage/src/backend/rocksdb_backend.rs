/// Embedded RocksDB table store
///
/// Every table is a column family. Tables are created on demand and
/// rediscovered from the database directory when it is reopened.
use parking_lot::RwLock;
use rocksdb::{
    BlockBasedOptions, BoundColumnFamily, Cache, ColumnFamilyDescriptor, DBCompressionType,
    DBWithThreadMode, IteratorMode, MultiThreaded, Options, WriteBatch, WriteOptions,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::TableStore;
use crate::error::{StorageError, StorageResult};
use culicidae_core::config::StoreConfig;

const DEFAULT_CF: &str = "default";

/// RocksDB tuning options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksStoreConfig {
    /// Database directory; a leading `~` is expanded
    pub path: PathBuf,

    /// Write buffer size in MB (default: 64)
    pub write_buffer_size_mb: usize,

    /// Maximum number of write buffers (default: 3)
    pub max_write_buffer_number: usize,

    /// Maximum background jobs (default: 4)
    pub max_background_jobs: i32,

    /// Block cache size in MB (default: 256)
    pub block_cache_size_mb: usize,

    /// Bloom filter bits per key, 0 disables the filter (default: 10)
    pub bloom_filter_bits: f64,

    /// Compression algorithm: "zstd", "lz4", "snappy" or "none" (default: "zstd")
    pub compression: String,
}

impl Default for RocksStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.culicidae/store"),
            write_buffer_size_mb: 64,
            max_write_buffer_number: 3,
            max_background_jobs: 4,
            block_cache_size_mb: 256,
            bloom_filter_bits: 10.0,
            compression: "zstd".to_string(),
        }
    }
}

impl From<&StoreConfig> for RocksStoreConfig {
    fn from(config: &StoreConfig) -> Self {
        Self {
            path: config.path(),
            write_buffer_size_mb: config.write_buffer_size_mb,
            block_cache_size_mb: config.block_cache_size_mb,
            compression: config.compression.clone(),
            ..Default::default()
        }
    }
}

pub struct RocksTableStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    config: RocksStoreConfig,
    path: PathBuf,
    /// Column families that hold tables (everything except "default")
    tables: RwLock<BTreeSet<String>>,
    write_opts: WriteOptions,
}

impl RocksTableStore {
    /// Open or create a store with default tuning
    pub fn open(path: &Path) -> StorageResult<Self> {
        let config = RocksStoreConfig {
            path: path.to_path_buf(),
            ..Default::default()
        };
        Self::with_config(config)
    }

    pub fn with_config(config: RocksStoreConfig) -> StorageResult<Self> {
        let path = Self::expand_path(&config.path)?;
        std::fs::create_dir_all(&path)?;

        let db_opts = Self::create_db_options(&config);

        // A fresh directory has no column family list yet
        let existing = DBWithThreadMode::<MultiThreaded>::list_cf(&db_opts, &path)
            .unwrap_or_else(|_| vec![DEFAULT_CF.to_string()]);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = existing
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Self::create_cf_options(&config)))
            .collect();

        let db = DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(
            &db_opts,
            &path,
            cf_descriptors,
        )
        .map_err(|e| {
            StorageError::Database(format!(
                "Failed to open RocksDB at path: {}. Error: {}",
                path.display(),
                e
            ))
        })?;

        let tables: BTreeSet<String> = existing
            .into_iter()
            .filter(|name| name != DEFAULT_CF)
            .collect();
        info!(path = %path.display(), tables = tables.len(), "opened table store");

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(false);
        write_opts.disable_wal(false);

        Ok(Self {
            db: Arc::new(db),
            config,
            path,
            tables: RwLock::new(tables),
            write_opts,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn compression_type(name: &str) -> DBCompressionType {
        match name {
            "zstd" => DBCompressionType::Zstd,
            "lz4" => DBCompressionType::Lz4,
            "snappy" => DBCompressionType::Snappy,
            "none" => DBCompressionType::None,
            _ => DBCompressionType::Zstd,
        }
    }

    fn create_db_options(config: &RocksStoreConfig) -> Options {
        let mut opts = Options::default();

        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(1000);

        opts.set_max_background_jobs(config.max_background_jobs);
        opts.increase_parallelism(num_cpus::get() as i32);

        opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        opts.set_max_write_buffer_number(config.max_write_buffer_number as i32);
        opts.set_compression_type(Self::compression_type(&config.compression));

        opts
    }

    fn create_cf_options(config: &RocksStoreConfig) -> Options {
        let mut opts = Options::default();

        opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        opts.set_max_write_buffer_number(config.max_write_buffer_number as i32);
        opts.set_compression_type(Self::compression_type(&config.compression));

        let mut block_opts = BlockBasedOptions::default();
        let cache = Cache::new_lru_cache(config.block_cache_size_mb * 1024 * 1024);
        block_opts.set_block_cache(&cache);
        if config.bloom_filter_bits > 0.0 {
            block_opts.set_bloom_filter(config.bloom_filter_bits, false);
        }
        opts.set_block_based_table_factory(&block_opts);

        opts
    }

    /// Expand tilde in path
    fn expand_path(path: &Path) -> StorageResult<PathBuf> {
        let path_str = path
            .to_str()
            .ok_or_else(|| StorageError::Database(format!("Invalid path: {}", path.display())))?;

        if let Some(rest) = path_str.strip_prefix('~') {
            let home = std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .map_err(|_| {
                    StorageError::Database("Could not determine home directory".to_string())
                })?;
            Ok(PathBuf::from(format!("{}{}", home, rest)))
        } else {
            Ok(path.to_path_buf())
        }
    }

    fn cf_handle(&self, name: &str) -> StorageResult<Arc<BoundColumnFamily<'_>>> {
        if !self.has_table(name) {
            return Err(StorageError::TableNotFound(name.to_string()));
        }
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }
}

impl TableStore for RocksTableStore {
    fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains(name)
    }

    fn create_table(&self, name: &str) -> StorageResult<()> {
        let mut tables = self.tables.write();
        if tables.contains(name) {
            return Ok(());
        }
        if name == DEFAULT_CF {
            return Err(StorageError::Database(format!(
                "'{}' is reserved and cannot be used as a table name",
                DEFAULT_CF
            )));
        }
        self.db
            .create_cf(name, &Self::create_cf_options(&self.config))?;
        tables.insert(name.to_string());
        debug!(table = name, "created column family");
        Ok(())
    }

    fn table_names(&self) -> Vec<String> {
        self.tables.read().iter().cloned().collect()
    }

    fn scan(&self, table: &str) -> StorageResult<Vec<(String, Vec<u8>)>> {
        let cf = self.cf_handle(table)?;
        let mut rows = Vec::new();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item?;
            let key = String::from_utf8(key.to_vec()).map_err(|e| StorageError::Decode {
                table: table.to_string(),
                key: String::from_utf8_lossy(&key).to_string(),
                message: e.to_string(),
            })?;
            rows.push((key, value.to_vec()));
        }

        Ok(rows)
    }

    fn get(&self, table: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let cf = self.cf_handle(table)?;
        Ok(self.db.get_cf(&cf, key.as_bytes())?)
    }

    fn put(&self, table: &str, key: &str, value: &[u8]) -> StorageResult<()> {
        let cf = self.cf_handle(table)?;
        self.db
            .put_cf_opt(&cf, key.as_bytes(), value, &self.write_opts)?;
        Ok(())
    }

    fn put_many(&self, table: &str, rows: &[(String, Vec<u8>)]) -> StorageResult<()> {
        let cf = self.cf_handle(table)?;
        let mut batch = WriteBatch::default();

        for (key, value) in rows {
            batch.put_cf(&cf, key.as_bytes(), value);
        }

        self.db.write_opt(batch, &self.write_opts)?;
        Ok(())
    }

    fn delete(&self, table: &str, key: &str) -> StorageResult<()> {
        let cf = self.cf_handle(table)?;
        self.db.delete_cf_opt(&cf, key.as_bytes(), &self.write_opts)?;
        Ok(())
    }

    fn replace_all(&self, table: &str, rows: &[(String, Vec<u8>)]) -> StorageResult<()> {
        let cf = self.cf_handle(table)?;
        let keep: HashSet<&str> = rows.iter().map(|(key, _)| key.as_str()).collect();
        let mut batch = WriteBatch::default();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _) = item?;
            if !std::str::from_utf8(&key).is_ok_and(|k| keep.contains(k)) {
                batch.delete_cf(&cf, &key);
            }
        }
        for (key, value) in rows {
            batch.put_cf(&cf, key.as_bytes(), value);
        }

        self.db.write_opt(batch, &self.write_opts)?;
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        for name in self.table_names() {
            let cf = self.cf_handle(&name)?;
            self.db.flush_cf(&cf)?;
        }
        Ok(())
    }
}

impl Drop for RocksTableStore {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
