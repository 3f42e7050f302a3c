//! Account identity and balance records
//!
//! Shared value types used by the ledger, the wager engine, and the
//! durable snapshot stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque external account handle (e.g. a chat user id).
///
/// The total order on ids doubles as the global lock-acquisition order for
/// multi-account operations.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() honors width and alignment flags in table output.
        f.pad(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A ledger entry: external id, human-readable label, point balance.
///
/// `balance` is a signed integer number of points and is never fractional;
/// rules that produce fractional intermediate amounts truncate before the
/// balance is touched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub display_name: String,
    pub balance: i64,
}

impl Account {
    pub fn new(id: AccountId, display_name: impl Into<String>, balance: i64) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            balance,
        }
    }
}
