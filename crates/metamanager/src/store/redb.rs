use super::{Meta, MetaStore, StoreError};
use crate::resource::KeyFilter;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use tracing::info;

// One table for every resource class; classes are told apart by key prefix.
const META_TABLE: TableDefinition<&str, &str> = TableDefinition::new("meta");

/// Store backed by an embedded redb database file.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Opens the database at `path`, creating the file and the table if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let db = Database::create(path)?;
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(META_TABLE)?;
        }
        write_txn.commit()?;
        info!(path = %path.display(), "Metadata store opened");
        Ok(Self { db })
    }
}

impl MetaStore for RedbStore {
    fn upsert(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(META_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(META_TABLE)?;
        let value = table.get(key)?.map(|v| v.value().to_string());
        Ok(value)
    }

    fn delete_by_filter(&self, filter: &KeyFilter) -> Result<usize, StoreError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(META_TABLE)?;
            let prefix = filter.scan_prefix();
            let mut doomed = Vec::new();
            for entry in table.range(prefix..)? {
                let (key, _) = entry?;
                let key = key.value();
                if !key.starts_with(prefix) {
                    break;
                }
                if filter.matches(key) {
                    doomed.push(key.to_string());
                }
            }
            for key in &doomed {
                table.remove(key.as_str())?;
            }
            doomed.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn scan_by_prefix(&self, prefix: &str) -> Result<Vec<Meta>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(META_TABLE)?;
        let mut rows = Vec::new();
        for entry in table.range(prefix..)? {
            let (key, value) = entry?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            rows.push(Meta {
                key: key.to_string(),
                value: value.value().to_string(),
            });
        }
        Ok(rows)
    }
}
