/// Typed access to the table store
use rayon::prelude::*;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::backend::{MemoryTableStore, RocksStoreConfig, RocksTableStore};
use crate::core::{Record, TableStore};
use crate::error::{StorageError, StorageResult};
use culicidae_core::config::StoreConfig;

/// Table names used by the catalog
pub mod table_names {
    pub const SPECIES: &str = "species";
    pub const DISEASES: &str = "diseases";
    pub const REGIONS: &str = "regions";
    pub const OBSERVATIONS: &str = "observations";
    pub const FILTER_OPTIONS: &str = "filter_options";

    /// Tables the reference cache requires at load
    pub const REFERENCE: [&str; 4] = [SPECIES, DISEASES, REGIONS, FILTER_OPTIONS];

    pub const ALL: [&str; 5] = [SPECIES, DISEASES, REGIONS, OBSERVATIONS, FILTER_OPTIONS];
}

/// Entry point to the table store. Cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn TableStore>,
}

impl Gateway {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Open the embedded RocksDB store described by the `[store]` config section
    pub fn open(config: &StoreConfig) -> StorageResult<Self> {
        let store = RocksTableStore::with_config(RocksStoreConfig::from(config))?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn open_path(path: &Path) -> StorageResult<Self> {
        Ok(Self::new(Arc::new(RocksTableStore::open(path)?)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTableStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.store.has_table(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.store.table_names()
    }

    pub fn ensure_table(&self, name: &str) -> StorageResult<()> {
        self.store.create_table(name)
    }

    /// Typed handle to an existing table
    pub fn get_table<T: Record>(&self, name: &str) -> StorageResult<TableHandle<T>> {
        if !self.store.has_table(name) {
            return Err(StorageError::TableNotFound(name.to_string()));
        }
        Ok(TableHandle {
            name: name.to_string(),
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        })
    }

    /// Typed handle, creating the table first when needed
    pub fn open_table<T: Record>(&self, name: &str) -> StorageResult<TableHandle<T>> {
        self.ensure_table(name)?;
        self.get_table(name)
    }

    pub fn flush(&self) -> StorageResult<()> {
        self.store.flush()
    }
}

/// A nearest-neighbour hit
#[derive(Debug, Clone)]
pub struct Neighbor<T> {
    pub record: T,
    /// Cosine similarity in [-1, 1], higher is closer
    pub score: f32,
}

pub struct TableHandle<T> {
    name: String,
    store: Arc<dyn TableStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TableHandle<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T: Record> TableHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, record: &T) -> StorageResult<Vec<u8>> {
        rmp_serde::to_vec_named(record).map_err(|e| StorageError::Encode {
            table: self.name.clone(),
            message: e.to_string(),
        })
    }

    fn decode(&self, key: &str, data: &[u8]) -> StorageResult<T> {
        rmp_serde::from_slice(data).map_err(|e| StorageError::Decode {
            table: self.name.clone(),
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// All rows in key order. Fails on the first row that does not decode.
    pub fn scan(&self) -> StorageResult<Vec<T>> {
        self.store
            .scan(&self.name)?
            .iter()
            .map(|(key, data)| self.decode(key, data))
            .collect()
    }

    pub fn scan_where<F>(&self, filter: F) -> StorageResult<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        let mut rows = Vec::new();
        for (key, data) in self.store.scan(&self.name)? {
            let record = self.decode(&key, &data)?;
            if filter(&record) {
                rows.push(record);
            }
        }
        Ok(rows)
    }

    pub fn get(&self, key: &str) -> StorageResult<Option<T>> {
        self.store
            .get(&self.name, key)?
            .map(|data| self.decode(key, &data))
            .transpose()
    }

    pub fn count(&self) -> StorageResult<usize> {
        Ok(self.store.scan(&self.name)?.len())
    }

    /// The `k` rows whose embedding is most similar to `query` by cosine similarity.
    /// Rows without an embedding of the same dimension are skipped. Ties are
    /// broken by ascending key.
    pub fn nearest(&self, query: &[f32], k: usize) -> StorageResult<Vec<Neighbor<T>>> {
        if k == 0 || query.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.scan()?;
        let total = rows.len();
        let mut scored: Vec<(String, f32, T)> = rows
            .into_par_iter()
            .filter_map(|record| {
                let score = cosine_similarity(query, record.embedding()?)?;
                Some((record.key(), score, record))
            })
            .collect();

        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);

        debug!(table = %self.name, scanned = total, returned = scored.len(), "nearest scan");
        Ok(scored
            .into_iter()
            .map(|(_, score, record)| Neighbor { record, score })
            .collect())
    }

    pub fn insert(&self, record: &T) -> StorageResult<()> {
        let data = self.encode(record)?;
        self.store.put(&self.name, &record.key(), &data)
    }

    pub fn insert_many(&self, records: &[T]) -> StorageResult<()> {
        let rows = records
            .iter()
            .map(|r| Ok((r.key(), self.encode(r)?)))
            .collect::<StorageResult<Vec<_>>>()?;
        self.store.put_many(&self.name, &rows)
    }

    /// Replace the whole table with `records`
    pub fn replace_all(&self, records: &[T]) -> StorageResult<()> {
        let rows = records
            .iter()
            .map(|r| Ok((r.key(), self.encode(r)?)))
            .collect::<StorageResult<Vec<_>>>()?;
        self.store.replace_all(&self.name, &rows)
    }
}

/// Cosine similarity, `None` on dimension mismatch or a zero vector
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use culicidae_core::{LocalizedText, Species};
    use pretty_assertions::assert_eq;

    fn species(id: &str, embedding: Vec<f32>) -> Species {
        Species {
            id: id.to_string(),
            scientific_name: id.replace('-', " "),
            common_names: LocalizedText::new(),
            vector_embedding: embedding,
            is_vector: false,
            region_ids: vec![],
            disease_ids: vec![],
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_get_table_requires_existing_table() {
        let gateway = Gateway::in_memory();
        assert!(matches!(
            gateway.get_table::<Species>(table_names::SPECIES),
            Err(StorageError::TableNotFound(_))
        ));

        let table = gateway.open_table::<Species>(table_names::SPECIES).unwrap();
        assert_eq!(table.name(), "species");
        assert!(gateway.get_table::<Species>(table_names::SPECIES).is_ok());
    }

    #[test]
    fn test_insert_get_scan_where() {
        let gateway = Gateway::in_memory();
        let table = gateway.open_table::<Species>(table_names::SPECIES).unwrap();

        table
            .insert_many(&[
                species("culex-pipiens", vec![]),
                species("aedes-aegypti", vec![]),
            ])
            .unwrap();
        let mut vector = species("anopheles-gambiae", vec![]);
        vector.is_vector = true;
        table.insert(&vector).unwrap();

        assert_eq!(table.count().unwrap(), 3);
        assert_eq!(
            table.get("aedes-aegypti").unwrap().map(|s| s.id),
            Some("aedes-aegypti".to_string())
        );
        assert!(table.get("missing").unwrap().is_none());

        let vectors = table.scan_where(|s| s.is_vector).unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].id, "anopheles-gambiae");
    }

    #[test]
    fn test_nearest_orders_by_similarity_then_key() {
        let gateway = Gateway::in_memory();
        let table = gateway.open_table::<Species>(table_names::SPECIES).unwrap();
        table
            .insert_many(&[
                species("b-exact", vec![1.0, 0.0]),
                species("a-exact", vec![2.0, 0.0]),
                species("c-orthogonal", vec![0.0, 1.0]),
                species("d-diagonal", vec![1.0, 1.0]),
                species("e-wrong-dim", vec![1.0, 0.0, 0.0]),
                species("f-none", vec![]),
            ])
            .unwrap();

        let hits = table.nearest(&[1.0, 0.0], 10).unwrap();
        let ids: Vec<_> = hits.iter().map(|n| n.record.id.as_str()).collect();
        assert_eq!(ids, vec!["a-exact", "b-exact", "d-diagonal", "c-orthogonal"]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);

        let top = table.nearest(&[1.0, 0.0], 2).unwrap();
        assert_eq!(top.len(), 2);
        assert!(table.nearest(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let gateway = Gateway::in_memory();
        gateway.ensure_table(table_names::SPECIES).unwrap();
        gateway
            .store()
            .put(table_names::SPECIES, "broken", b"\xc1\xc1")
            .unwrap();

        let table = gateway.get_table::<Species>(table_names::SPECIES).unwrap();
        match table.scan() {
            Err(StorageError::Decode { key, .. }) => assert_eq!(key, "broken"),
            other => panic!("expected decode error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), Some(1.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), None);
        let s = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((s + 1.0).abs() < 1e-6);
    }
}
