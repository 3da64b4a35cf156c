pub mod memory_backend;
pub mod rocksdb_backend;

pub use memory_backend::MemoryTableStore;
pub use rocksdb_backend::{RocksStoreConfig, RocksTableStore};
