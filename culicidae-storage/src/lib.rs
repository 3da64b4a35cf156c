//! Table store gateway for the culicidae catalog
//!
//! Rows are MessagePack-encoded records grouped into named tables. Two
//! backends implement [`TableStore`]: an embedded RocksDB store with one
//! column family per table and an in-memory store used by tests and
//! short-lived tools.

pub mod backend;
pub mod core;
pub mod error;
pub mod records;
pub mod table;

pub use backend::{MemoryTableStore, RocksStoreConfig, RocksTableStore};
pub use core::{Record, TableStore};
pub use error::{StorageError, StorageResult};
pub use table::{table_names, Gateway, Neighbor, TableHandle};
