/// In-memory table store backed by DashMap
use dashmap::DashMap;
use std::sync::Arc;

use crate::core::TableStore;
use crate::error::{StorageError, StorageResult};

type Table = Arc<DashMap<String, Vec<u8>>>;

#[derive(Default)]
pub struct MemoryTableStore {
    tables: DashMap<String, Table>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, name: &str) -> StorageResult<Table> {
        self.tables
            .get(name)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }
}

impl TableStore for MemoryTableStore {
    fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    fn create_table(&self, name: &str) -> StorageResult<()> {
        self.tables.entry(name.to_string()).or_default();
        Ok(())
    }

    fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn scan(&self, table: &str) -> StorageResult<Vec<(String, Vec<u8>)>> {
        let table = self.table(table)?;
        let mut rows: Vec<(String, Vec<u8>)> = table
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }

    fn get(&self, table: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.table(table)?.get(key).map(|v| v.value().clone()))
    }

    fn put(&self, table: &str, key: &str, value: &[u8]) -> StorageResult<()> {
        self.table(table)?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, table: &str, key: &str) -> StorageResult<()> {
        self.table(table)?.remove(key);
        Ok(())
    }
}
