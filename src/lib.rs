//! Scrip - concurrent, crash-consistent points ledger
//!
//! In-memory authoritative balances with periodic durable checkpointing,
//! randomized wager settlement, scheduled income accrual, and a typed
//! command boundary for an external façade.

pub mod account;
pub mod accrual;
pub mod checkpoint;
pub mod commands;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod service;
pub mod store;
pub mod wager;

pub use account::{Account, AccountId};
pub use config::ScripConfig;
pub use errors::{LedgerError, LedgerResult, StoreError};
pub use ledger::Ledger;
pub use service::LedgerService;
