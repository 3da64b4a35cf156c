use crate::error::StorageResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;

/// Byte-level table store. Keys are UTF-8 row ids, values are encoded rows.
///
/// `scan` returns rows in ascending key order for every implementation.
pub trait TableStore: Send + Sync {
    fn has_table(&self, name: &str) -> bool;

    /// Create the table if it does not exist yet
    fn create_table(&self, name: &str) -> StorageResult<()>;

    fn table_names(&self) -> Vec<String>;

    fn scan(&self, table: &str) -> StorageResult<Vec<(String, Vec<u8>)>>;

    fn get(&self, table: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    fn put(&self, table: &str, key: &str, value: &[u8]) -> StorageResult<()>;

    fn delete(&self, table: &str, key: &str) -> StorageResult<()>;

    /// Write several rows. Backends with batch support apply them atomically.
    fn put_many(&self, table: &str, rows: &[(String, Vec<u8>)]) -> StorageResult<()> {
        for (key, value) in rows {
            self.put(table, key, value)?;
        }
        Ok(())
    }

    /// Make `rows` the full contents of the table, deleting keys not among them.
    /// Backends with batch support apply the swap atomically.
    fn replace_all(&self, table: &str, rows: &[(String, Vec<u8>)]) -> StorageResult<()> {
        let keep: HashSet<&str> = rows.iter().map(|(key, _)| key.as_str()).collect();
        for (key, _) in self.scan(table)? {
            if !keep.contains(key.as_str()) {
                self.delete(table, &key)?;
            }
        }
        self.put_many(table, rows)
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// A row type stored in a table
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Primary key, unique within the table
    fn key(&self) -> String;

    /// Vector column used by nearest-neighbour search, if any
    fn embedding(&self) -> Option<&[f32]> {
        None
    }
}
