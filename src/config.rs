//! Configuration management with validation and defaults
//!
//! Nested sections mirror the TOML file layout; every section carries
//! working defaults so a bare `ScripConfig::default()` runs.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level service configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScripConfig {
    pub ledger: LedgerSettings,
    pub wager: WagerSettings,
    pub checkpoint: CheckpointSettings,
    pub accrual: AccrualSettings,
    pub storage: StorageSettings,
}

impl Default for ScripConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerSettings::default(),
            wager: WagerSettings::default(),
            checkpoint: CheckpointSettings::default(),
            accrual: AccrualSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

/// Account creation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Balance granted to every newly created account.
    pub starting_balance: i64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            starting_balance: 10_000,
        }
    }
}

/// Wager engine settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WagerSettings {
    /// Cap applied to an all-in stake.
    pub max_all_in: i64,
}

impl Default for WagerSettings {
    fn default() -> Self {
        Self {
            max_all_in: 250_000,
        }
    }
}

/// Durable checkpoint cadence.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointSettings {
    pub interval_secs: u64,
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self { interval_secs: 600 }
    }
}

/// Scheduled income settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AccrualSettings {
    pub interval_secs: u64,
    /// Points credited to every account per cycle.
    pub amount: i64,
}

impl Default for AccrualSettings {
    fn default() -> Self {
        Self {
            interval_secs: 3_600,
            amount: 250,
        }
    }
}

/// Snapshot backend selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Rocksdb,
    Memory,
}

/// Durable store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Snapshot file path for the file backend.
    pub path: String,
    /// Database directory for the rocksdb backend.
    pub data_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: "./data/ledger.json".to_string(),
            data_dir: "./data/ledger-db".to_string(),
        }
    }
}

/// Validation and factory methods
impl ScripConfig {
    /// Load and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Short intervals and the in-memory backend, for tests and local
    /// experiments.
    pub fn fast_test() -> Self {
        Self {
            checkpoint: CheckpointSettings { interval_secs: 1 },
            accrual: AccrualSettings {
                interval_secs: 1,
                amount: 250,
            },
            storage: StorageSettings {
                backend: StorageBackend::Memory,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate for logical consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.starting_balance < 0 {
            return Err(ConfigError::InvalidValue(
                "ledger.starting_balance must not be negative".to_string(),
            ));
        }
        if self.wager.max_all_in <= 0 {
            return Err(ConfigError::InvalidValue(
                "wager.max_all_in must be positive".to_string(),
            ));
        }
        if self.checkpoint.interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "checkpoint.interval_secs must be > 0".to_string(),
            ));
        }
        if self.accrual.interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "accrual.interval_secs must be > 0".to_string(),
            ));
        }
        if self.accrual.amount <= 0 {
            return Err(ConfigError::InvalidValue(
                "accrual.amount must be positive".to_string(),
            ));
        }
        match self.storage.backend {
            StorageBackend::File if self.storage.path.is_empty() => {
                return Err(ConfigError::InvalidValue(
                    "storage.path must not be empty for the file backend".to_string(),
                ));
            }
            StorageBackend::Rocksdb if self.storage.data_dir.is_empty() => {
                return Err(ConfigError::InvalidValue(
                    "storage.data_dir must not be empty for the rocksdb backend".to_string(),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint.interval_secs)
    }

    pub fn accrual_interval(&self) -> Duration {
        Duration::from_secs(self.accrual.interval_secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("failed to parse configuration: {0}")]
    ParseFailed(String),
}
