use super::{Meta, MetaStore, StoreError};
use crate::resource::KeyFilter;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory store.
///
/// Counts the calls it serves so tests can assert that a message did or did not reach
/// persistence.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<String, String>>,
    writes: AtomicUsize,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `upsert` and `delete_by_filter` calls served.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `get` and scan calls served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl MetaStore for MemoryStore {
    fn upsert(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.rows.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.read().get(key).cloned())
    }

    fn delete_by_filter(&self, filter: &KeyFilter) -> Result<usize, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|key, _| !filter.matches(key));
        Ok(before - rows.len())
    }

    fn scan_by_prefix(&self, prefix: &str) -> Result<Vec<Meta>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read();
        Ok(rows
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| Meta {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }
}
