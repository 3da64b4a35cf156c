//! Table store with injectable write failures
//!
//! Wraps the in-memory backend. Reads always succeed; writes to the tables
//! named in `fail_writes` return a database error, which is how tests simulate
//! a store outage in the middle of a pipeline run.

use culicidae_storage::{MemoryTableStore, StorageError, StorageResult, TableStore};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct FailingTableStore {
    inner: MemoryTableStore,
    fail_writes: RwLock<HashSet<String>>,
    rejected: AtomicUsize,
}

impl FailingTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start rejecting writes to `table`
    pub fn fail_writes_to(&self, table: &str) {
        self.fail_writes.write().insert(table.to_string());
    }

    /// Accept writes again
    pub fn heal(&self) {
        self.fail_writes.write().clear();
    }

    pub fn rejected_writes(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    fn check(&self, table: &str) -> StorageResult<()> {
        let failing = self.fail_writes.read().contains(table);
        if failing {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Database(format!(
                "injected write failure on '{}'",
                table
            )));
        }
        Ok(())
    }
}

impl TableStore for FailingTableStore {
    fn has_table(&self, name: &str) -> bool {
        self.inner.has_table(name)
    }

    fn create_table(&self, name: &str) -> StorageResult<()> {
        self.inner.create_table(name)
    }

    fn table_names(&self) -> Vec<String> {
        self.inner.table_names()
    }

    fn scan(&self, table: &str) -> StorageResult<Vec<(String, Vec<u8>)>> {
        self.inner.scan(table)
    }

    fn get(&self, table: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(table, key)
    }

    fn put(&self, table: &str, key: &str, value: &[u8]) -> StorageResult<()> {
        self.check(table)?;
        self.inner.put(table, key, value)
    }

    fn put_many(&self, table: &str, rows: &[(String, Vec<u8>)]) -> StorageResult<()> {
        self.check(table)?;
        self.inner.put_many(table, rows)
    }

    fn delete(&self, table: &str, key: &str) -> StorageResult<()> {
        self.check(table)?;
        self.inner.delete(table, key)
    }

    fn replace_all(&self, table: &str, rows: &[(String, Vec<u8>)]) -> StorageResult<()> {
        self.check(table)?;
        self.inner.replace_all(table, rows)
    }
}
