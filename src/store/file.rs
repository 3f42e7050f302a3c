//! Flat-file JSON snapshot backend
//!
//! One JSON document holds the whole snapshot. Writes go to a temp file in
//! the target directory, fsync, then rename over the previous snapshot, so
//! a crash at any point leaves either the old file or the new one, never a
//! torn one.

use super::SnapshotStore;
use crate::account::Account;
use crate::errors::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    written_at: DateTime<Utc>,
    accounts: Vec<Account>,
}

/// JSON snapshot in a single atomically-replaced file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn load(&self) -> Result<Option<Vec<Account>>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Unavailable(err.to_string())),
        };
        let snapshot: SnapshotFile = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::Corrupted(format!("{}: {}", self.path.display(), e))
        })?;
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::Corrupted(format!(
                "{}: unsupported snapshot version {}",
                self.path.display(),
                snapshot.version
            )));
        }
        Ok(Some(snapshot.accounts))
    }

    async fn replace_all(&self, accounts: &[Account]) -> Result<(), StoreError> {
        let mut accounts = accounts.to_vec();
        // Stable on-disk order keeps snapshots diffable.
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        let snapshot = SnapshotFile {
            version: SNAPSHOT_FORMAT_VERSION,
            written_at: Utc::now(),
            accounts,
        };
        let encoded = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        let dir = self.parent_dir();
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&encoded)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file snapshot at {}", self.path.display())
    }
}
