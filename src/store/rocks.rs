//! RocksDB snapshot backend
//!
//! One bincode record per account under an `acct:` key prefix plus a
//! metadata record. Replace-all deletes the previous account keys and
//! writes the new ones in a single atomic `WriteBatch`.

use super::SnapshotStore;
use crate::account::{Account, AccountId};
use crate::errors::StoreError;
use async_trait::async_trait;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SNAPSHOT_FORMAT_VERSION: u32 = 1;
const ACCOUNT_KEY_PREFIX: &[u8] = b"acct:";
const META_KEY: &[u8] = b"snapshot:meta";

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotMeta {
    version: u32,
    written_at_ms: i64,
    account_count: u64,
}

/// Account-per-key snapshot in RocksDB.
pub struct RocksStore {
    db: Arc<DB>,
    path: PathBuf,
}

impl RocksStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(32 * 1024 * 1024);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, &path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    fn account_key(id: &AccountId) -> Vec<u8> {
        let mut key = Vec::with_capacity(ACCOUNT_KEY_PREFIX.len() + id.as_str().len());
        key.extend_from_slice(ACCOUNT_KEY_PREFIX);
        key.extend_from_slice(id.as_str().as_bytes());
        key
    }

    /// Every key currently under the account prefix.
    fn existing_account_keys(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut keys = Vec::new();
        let mode = IteratorMode::From(ACCOUNT_KEY_PREFIX, Direction::Forward);
        for item in self.db.iterator(mode) {
            let (key, _) = item?;
            if !key.starts_with(ACCOUNT_KEY_PREFIX) {
                break;
            }
            keys.push(key.to_vec());
        }
        Ok(keys)
    }
}

#[async_trait]
impl SnapshotStore for RocksStore {
    async fn load(&self) -> Result<Option<Vec<Account>>, StoreError> {
        let meta_bytes = match self.db.get(META_KEY)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let meta: SnapshotMeta = bincode::deserialize(&meta_bytes)
            .map_err(|e| StoreError::Corrupted(format!("snapshot metadata: {}", e)))?;
        if meta.version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::Corrupted(format!(
                "unsupported snapshot version {}",
                meta.version
            )));
        }

        let mut accounts = Vec::with_capacity(meta.account_count as usize);
        let mode = IteratorMode::From(ACCOUNT_KEY_PREFIX, Direction::Forward);
        for item in self.db.iterator(mode) {
            let (key, value) = item?;
            if !key.starts_with(ACCOUNT_KEY_PREFIX) {
                break;
            }
            let account: Account = bincode::deserialize(&value).map_err(|e| {
                StoreError::Corrupted(format!(
                    "account record {}: {}",
                    String::from_utf8_lossy(&key),
                    e
                ))
            })?;
            accounts.push(account);
        }

        if accounts.len() as u64 != meta.account_count {
            return Err(StoreError::Corrupted(format!(
                "snapshot metadata lists {} accounts, found {}",
                meta.account_count,
                accounts.len()
            )));
        }
        Ok(Some(accounts))
    }

    async fn replace_all(&self, accounts: &[Account]) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        for key in self.existing_account_keys()? {
            batch.delete(key);
        }
        for account in accounts {
            let encoded = bincode::serialize(account)
                .map_err(|e| StoreError::Serialize(e.to_string()))?;
            batch.put(Self::account_key(&account.id), encoded);
        }
        let meta = SnapshotMeta {
            version: SNAPSHOT_FORMAT_VERSION,
            written_at_ms: chrono::Utc::now().timestamp_millis(),
            account_count: accounts.len() as u64,
        };
        let meta_encoded =
            bincode::serialize(&meta).map_err(|e| StoreError::Serialize(e.to_string()))?;
        batch.put(META_KEY, meta_encoded);

        self.db.write(batch)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("rocksdb snapshot at {}", self.path.display())
    }
}
