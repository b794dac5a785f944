//! # Metadata Store
//!
//! Durable key/value persistence for resource records. A row is a resource path and the
//! canonical text of its content; writing an existing key overwrites it.
//!
//! The engine only depends on the [`MetaStore`] trait, so the backend is chosen at startup:
//!
//! - [`RedbStore`] - an embedded redb database file, used in production
//! - [`MemoryStore`] - a `BTreeMap`, used in tests and for ephemeral nodes
//!
//! Calls are synchronous and individually atomic. The engine calls them from many tasks at
//! once, so implementations must be `Send + Sync`.

mod memory;
mod redb;

pub use memory::MemoryStore;
pub use self::redb::RedbStore;

use crate::resource::KeyFilter;
use thiserror::Error;

/// A persisted resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    pub key: String,
    pub value: String,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] ::redb::DatabaseError),

    #[error("Table error: {0}")]
    Table(#[from] ::redb::TableError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] ::redb::TransactionError),

    #[error("Commit error: {0}")]
    Commit(#[from] ::redb::CommitError),

    #[error("Storage error: {0}")]
    Storage(#[from] ::redb::StorageError),

    #[error("{0}")]
    Backend(String),
}

/// Persistence backend for resource records.
pub trait MetaStore: Send + Sync {
    /// Inserts or overwrites the row for `key`.
    fn upsert(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Removes every row `filter` selects and returns how many were removed.
    fn delete_by_filter(&self, filter: &KeyFilter) -> Result<usize, StoreError>;

    /// Every row whose key starts with `prefix`, in key order.
    fn scan_by_prefix(&self, prefix: &str) -> Result<Vec<Meta>, StoreError>;

    /// Every row `filter` selects, in key order.
    fn scan(&self, filter: &KeyFilter) -> Result<Vec<Meta>, StoreError> {
        match filter {
            KeyFilter::Exact(key) => Ok(self
                .get(key)?
                .map(|value| Meta {
                    key: key.clone(),
                    value,
                })
                .into_iter()
                .collect()),
            KeyFilter::Prefix(prefix) => self.scan_by_prefix(prefix),
            KeyFilter::Type(_) => Ok(self
                .scan_by_prefix("")?
                .into_iter()
                .filter(|meta| filter.matches(&meta.key))
                .collect()),
        }
    }
}
