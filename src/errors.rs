//! Error types for ledger, wager, and durable-store operations
//!
//! Caller errors (`NotFound`, `InsufficientFunds`, `InvalidArgument`) are
//! returned as typed results and are never treated as system failures;
//! store errors surface as `LedgerError::Store` and are fatal only during
//! the startup load.

use crate::account::AccountId;

/// Root error type surfaced to callers of ledger and wager operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("account {id} not found")]
    NotFound { id: AccountId },

    #[error("insufficient funds for {id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        id: AccountId,
        balance: i64,
        requested: i64,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("durable store error: {0}")]
    Store(#[from] StoreError),
}

/// Durable snapshot store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot corrupted: {0}")]
    Corrupted(String),

    #[error("snapshot encoding failed: {0}")]
    Serialize(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl LedgerError {
    /// True for errors caused by the request rather than by the system.
    /// Caller errors are rendered to the user and never logged as failures.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, LedgerError::Store(_))
    }
}

/// Convenience alias used throughout the crate.
pub type LedgerResult<T> = Result<T, LedgerError>;
