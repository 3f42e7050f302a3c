//! In-memory authoritative account ledger
//!
//! Accounts live in a sharded concurrent map of individually locked
//! records, so independent bets and transfers never serialize on one
//! global lock. Mutators hold the snapshot gate shared; `snapshot` holds
//! it exclusive, which bounds how long a copy can block mutation to the
//! copy itself and guarantees a copy never observes a half-applied
//! transfer.

use crate::account::{Account, AccountId};
use crate::errors::{LedgerError, LedgerResult};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, RwLock};

type AccountCell = Arc<Mutex<Account>>;

/// Concurrent map of account id to balance record.
pub struct Ledger {
    accounts: DashMap<AccountId, AccountCell>,
    snapshot_gate: RwLock<()>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            snapshot_gate: RwLock::new(()),
        }
    }

    /// Rebuild a ledger from a durable snapshot.
    pub fn from_snapshot(records: Vec<Account>) -> Self {
        let ledger = Self::new();
        for record in records {
            ledger
                .accounts
                .insert(record.id.clone(), Arc::new(Mutex::new(record)));
        }
        ledger
    }

    /// Return the existing account or insert a new one with the given
    /// starting balance. Exactly one account is created even under
    /// concurrent first-access for the same id; an existing balance is
    /// never overwritten. The display name refreshes when the owner is
    /// seen under a different non-empty name.
    pub fn get_or_create(
        &self,
        id: &AccountId,
        display_name: &str,
        starting_balance: i64,
    ) -> Account {
        let _gate = self.snapshot_gate.read().unwrap();
        let cell = self
            .accounts
            .entry(id.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Account::new(
                    id.clone(),
                    display_name,
                    starting_balance,
                )))
            })
            .clone();
        let mut account = cell.lock().unwrap();
        if !display_name.is_empty() && account.display_name != display_name {
            account.display_name = display_name.to_string();
        }
        account.clone()
    }

    /// Current balance, or `NotFound` for an unknown id.
    pub fn balance_of(&self, id: &AccountId) -> LedgerResult<i64> {
        let cell = self.cell(id)?;
        let account = cell.lock().unwrap();
        Ok(account.balance)
    }

    /// Atomically apply `balance += delta`. Debits that would take the
    /// balance below zero fail with `InsufficientFunds` and leave the
    /// balance unchanged.
    pub fn adjust(&self, id: &AccountId, delta: i64) -> LedgerResult<i64> {
        let _gate = self.snapshot_gate.read().unwrap();
        let cell = self.cell(id)?;
        let mut account = cell.lock().unwrap();
        let next = account.balance.checked_add(delta).ok_or_else(|| {
            LedgerError::InvalidArgument(format!(
                "adjustment of {} overflows balance {}",
                delta, account.balance
            ))
        })?;
        if delta < 0 && next < 0 {
            return Err(LedgerError::InsufficientFunds {
                id: id.clone(),
                balance: account.balance,
                // i64::MIN cannot be negated; saturate the reported amount.
                requested: delta.saturating_neg(),
            });
        }
        account.balance = next;
        Ok(next)
    }

    /// Atomically debit `from` and credit `to`. No partial effect on
    /// failure. Both records are locked in ascending-id order so opposing
    /// transfers on the same pair cannot deadlock.
    pub fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: i64,
    ) -> LedgerResult<(i64, i64)> {
        if from == to {
            return Err(LedgerError::InvalidArgument(
                "cannot transfer to the same account".to_string(),
            ));
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidArgument(format!(
                "transfer amount must be positive, got {}",
                amount
            )));
        }

        let _gate = self.snapshot_gate.read().unwrap();
        let from_cell = self.cell(from)?;
        let to_cell = self.cell(to)?;

        let (mut from_account, mut to_account) = if from < to {
            let f = from_cell.lock().unwrap();
            let t = to_cell.lock().unwrap();
            (f, t)
        } else {
            let t = to_cell.lock().unwrap();
            let f = from_cell.lock().unwrap();
            (f, t)
        };

        if from_account.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                id: from.clone(),
                balance: from_account.balance,
                requested: amount,
            });
        }
        let credited = to_account.balance.checked_add(amount).ok_or_else(|| {
            LedgerError::InvalidArgument(format!(
                "transfer of {} overflows balance {}",
                amount, to_account.balance
            ))
        })?;

        from_account.balance -= amount;
        to_account.balance = credited;
        Ok((from_account.balance, to_account.balance))
    }

    /// Up to `n` accounts ranked by descending balance, ties broken by
    /// ascending id. Ranks start at 1.
    pub fn top(&self, n: usize) -> LedgerResult<Vec<(Account, usize)>> {
        if n == 0 {
            return Err(LedgerError::InvalidArgument(
                "leaderboard size must be positive".to_string(),
            ));
        }
        let mut accounts = self.snapshot();
        accounts.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.id.cmp(&b.id)));
        accounts.truncate(n);
        Ok(accounts
            .into_iter()
            .enumerate()
            .map(|(i, account)| (account, i + 1))
            .collect())
    }

    /// Point-in-time consistent copy of every account. Holds the snapshot
    /// gate exclusively for the duration of the copy, so no in-flight
    /// mutation is observed half-applied.
    pub fn snapshot(&self) -> Vec<Account> {
        let _gate = self.snapshot_gate.write().unwrap();
        self.accounts
            .iter()
            .map(|entry| entry.value().lock().unwrap().clone())
            .collect()
    }

    /// Ids of every account. The list is a point-in-time copy; accounts
    /// created afterwards are not included.
    pub fn ids(&self) -> Vec<AccountId> {
        self.accounts.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Sum of all balances from one consistent snapshot.
    pub fn total_points(&self) -> i64 {
        self.snapshot().iter().map(|account| account.balance).sum()
    }

    fn cell(&self, id: &AccountId) -> LedgerResult<AccountCell> {
        self.accounts
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::NotFound { id: id.clone() })
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn id(s: &str) -> AccountId {
        AccountId::from(s)
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let ledger = Ledger::new();
        let first = ledger.get_or_create(&id("alice"), "Alice", 10_000);
        assert_eq!(first.balance, 10_000);

        ledger.adjust(&id("alice"), -2_500).unwrap();
        let second = ledger.get_or_create(&id("alice"), "Alice", 10_000);
        assert_eq!(second.balance, 7_500);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_get_or_create_refreshes_display_name() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 1_000);
        let renamed = ledger.get_or_create(&id("alice"), "Alicia", 1_000);
        assert_eq!(renamed.display_name, "Alicia");
        assert_eq!(renamed.balance, 1_000);

        // An empty name never clobbers the stored one.
        let kept = ledger.get_or_create(&id("alice"), "", 1_000);
        assert_eq!(kept.display_name, "Alicia");
    }

    #[test]
    fn test_balance_of_unknown_account() {
        let ledger = Ledger::new();
        let err = ledger.balance_of(&id("ghost")).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[test]
    fn test_adjust_applies_credits_and_debits() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 100);
        assert_eq!(ledger.adjust(&id("alice"), 50).unwrap(), 150);
        assert_eq!(ledger.adjust(&id("alice"), -150).unwrap(), 0);
    }

    #[test]
    fn test_adjust_rejects_overdraft_and_leaves_balance() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 100);
        let err = ledger.adjust(&id("alice"), -101).unwrap_err();
        match err {
            LedgerError::InsufficientFunds {
                balance, requested, ..
            } => {
                assert_eq!(balance, 100);
                assert_eq!(requested, 101);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(ledger.balance_of(&id("alice")).unwrap(), 100);
    }

    #[test]
    fn test_adjust_rejects_overflow() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", i64::MAX - 1);
        let err = ledger.adjust(&id("alice"), 2).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
        assert_eq!(ledger.balance_of(&id("alice")).unwrap(), i64::MAX - 1);
    }

    #[test]
    fn test_adjust_rejects_i64_min_debit() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 5);
        let err = ledger.adjust(&id("alice"), i64::MIN).unwrap_err();
        match err {
            LedgerError::InsufficientFunds {
                balance, requested, ..
            } => {
                assert_eq!(balance, 5);
                // The true magnitude does not fit in i64; it saturates.
                assert_eq!(requested, i64::MAX);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(ledger.balance_of(&id("alice")).unwrap(), 5);
    }

    #[test]
    fn test_transfer_moves_points() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 1_000);
        ledger.get_or_create(&id("bob"), "Bob", 500);
        let (from_balance, to_balance) =
            ledger.transfer(&id("alice"), &id("bob"), 300).unwrap();
        assert_eq!(from_balance, 700);
        assert_eq!(to_balance, 800);
    }

    #[test]
    fn test_transfer_round_trip_restores_balances() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 1_000);
        ledger.get_or_create(&id("bob"), "Bob", 500);
        ledger.transfer(&id("alice"), &id("bob"), 250).unwrap();
        ledger.transfer(&id("bob"), &id("alice"), 250).unwrap();
        assert_eq!(ledger.balance_of(&id("alice")).unwrap(), 1_000);
        assert_eq!(ledger.balance_of(&id("bob")).unwrap(), 500);
    }

    #[test]
    fn test_transfer_rejects_self_and_non_positive_amounts() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 1_000);
        assert!(matches!(
            ledger.transfer(&id("alice"), &id("alice"), 100),
            Err(LedgerError::InvalidArgument(_))
        ));
        ledger.get_or_create(&id("bob"), "Bob", 0);
        assert!(matches!(
            ledger.transfer(&id("alice"), &id("bob"), 0),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            ledger.transfer(&id("alice"), &id("bob"), -5),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_failed_transfer_has_no_partial_effect() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 100);
        ledger.get_or_create(&id("bob"), "Bob", 50);
        let err = ledger.transfer(&id("alice"), &id("bob"), 200).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(ledger.balance_of(&id("alice")).unwrap(), 100);
        assert_eq!(ledger.balance_of(&id("bob")).unwrap(), 50);
    }

    #[test]
    fn test_transfer_unknown_account() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 100);
        assert!(matches!(
            ledger.transfer(&id("alice"), &id("ghost"), 10),
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            ledger.transfer(&id("ghost"), &id("alice"), 10),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_top_orders_by_balance_then_id() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("carol"), "Carol", 500);
        ledger.get_or_create(&id("alice"), "Alice", 900);
        ledger.get_or_create(&id("bob"), "Bob", 500);
        ledger.get_or_create(&id("dave"), "Dave", 100);

        let top = ledger.top(3).unwrap();
        let names: Vec<(&str, usize)> = top
            .iter()
            .map(|(account, rank)| (account.id.as_str(), *rank))
            .collect();
        // Equal balances fall back to ascending id: bob before carol.
        assert_eq!(names, vec![("alice", 1), ("bob", 2), ("carol", 3)]);
    }

    #[test]
    fn test_top_rejects_zero() {
        let ledger = Ledger::new();
        assert!(matches!(
            ledger.top(0),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 1_000);
        ledger.get_or_create(&id("bob"), "Bob", 2_000);

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.len(), 2);

        let restored = Ledger::from_snapshot(snapshot);
        assert_eq!(restored.balance_of(&id("alice")).unwrap(), 1_000);
        assert_eq!(restored.balance_of(&id("bob")).unwrap(), 2_000);
        assert_eq!(restored.total_points(), 3_000);
    }

    #[test]
    fn test_concurrent_first_access_creates_one_account() {
        let ledger = Arc::new(Ledger::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                ledger.get_or_create(&AccountId::from("alice"), "Alice", 10_000)
            }));
        }
        for handle in handles {
            let account = handle.join().unwrap();
            assert_eq!(account.balance, 10_000);
        }
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.total_points(), 10_000);
    }

    #[test]
    fn test_concurrent_adjusts_serialize_per_account() {
        let ledger = Arc::new(Ledger::new());
        ledger.get_or_create(&id("alice"), "Alice", 0);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                for _ in 0..1_000 {
                    ledger.adjust(&AccountId::from("alice"), 1).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ledger.balance_of(&id("alice")).unwrap(), 8_000);
    }

    #[test]
    fn test_opposing_transfers_do_not_deadlock() {
        let ledger = Arc::new(Ledger::new());
        ledger.get_or_create(&id("alice"), "Alice", 100_000);
        ledger.get_or_create(&id("bob"), "Bob", 100_000);

        let forward = {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let _ = ledger.transfer(&AccountId::from("alice"), &AccountId::from("bob"), 10);
                }
            })
        };
        let backward = {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let _ = ledger.transfer(&AccountId::from("bob"), &AccountId::from("alice"), 10);
                }
            })
        };
        forward.join().unwrap();
        backward.join().unwrap();

        assert_eq!(ledger.total_points(), 200_000);
    }
}
