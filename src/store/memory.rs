//! In-memory snapshot backend
//!
//! Used by tests and local experiments. `set_fail_writes` turns every
//! `replace_all` into an `Unavailable` error for flush-retry tests.

use super::SnapshotStore;
use crate::account::Account;
use crate::errors::StoreError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

pub struct MemoryStore {
    snapshot: Mutex<Option<Vec<Account>>>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(None),
            fail_writes: AtomicBool::new(false),
            writes: AtomicU64::new(0),
        }
    }

    /// Start with an existing snapshot, as if a previous process had
    /// flushed it.
    pub fn with_snapshot(accounts: Vec<Account>) -> Self {
        let store = Self::new();
        *store.snapshot.lock().unwrap() = Some(accounts);
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Option<Vec<Account>>, StoreError> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn replace_all(&self, accounts: &[Account]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store write failures enabled".to_string(),
            ));
        }
        *self.snapshot.lock().unwrap() = Some(accounts.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory snapshot".to_string()
    }
}
