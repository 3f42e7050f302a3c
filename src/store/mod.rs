//! Durable snapshot store boundary and backends
//!
//! The ledger persists as whole snapshots: `load` rehydrates everything at
//! startup, `replace_all` atomically swaps the previous snapshot for a new
//! one on every checkpoint. Nothing is ever partially updated.

mod file;
mod memory;
mod rocks;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use rocks::RocksStore;

use crate::account::Account;
use crate::config::{StorageBackend, StorageSettings};
use crate::errors::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

/// Whole-snapshot persistence contract.
///
/// `load` yields `None` when no snapshot has ever been written, which is
/// distinct from an empty snapshot. Backends must make `replace_all`
/// atomic: a crash mid-write leaves the previous snapshot intact.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<Vec<Account>>, StoreError>;

    async fn replace_all(&self, accounts: &[Account]) -> Result<(), StoreError>;

    /// Human-readable backend description for startup logging.
    fn describe(&self) -> String;
}

/// Build the backend selected by `[storage]`.
pub fn open(settings: &StorageSettings) -> Result<Arc<dyn SnapshotStore>, StoreError> {
    match settings.backend {
        StorageBackend::File => Ok(Arc::new(FileStore::new(&settings.path))),
        StorageBackend::Rocksdb => Ok(Arc::new(RocksStore::open(&settings.data_dir)?)),
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
