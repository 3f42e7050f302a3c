//! Stateless wager rules applied against the ledger
//!
//! Each wager is a single-shot decision: validate the stake, draw one
//! uniform roll, settle the band, apply the delta through `Ledger::adjust`.
//! There is no multi-step game state.

use crate::account::AccountId;
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::Ledger;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Upper roll bound, inclusive.
const ROLL_MAX: u8 = 100;
/// Rolls at or below this lose the stake.
const LOSS_CEILING: u8 = 50;
/// Jackpot pays three times the stake.
const JACKPOT_MULTIPLIER: i64 = 3;

/// Wager stake as supplied by the caller: a point amount or the all-in
/// sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stake {
    All,
    Points(i64),
}

impl FromStr for Stake {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Stake::All);
        }
        s.parse::<i64>().map(Stake::Points).map_err(|_| {
            LedgerError::InvalidArgument(format!(
                "stake must be a positive integer or \"all\", got {:?}",
                s
            ))
        })
    }
}

impl fmt::Display for Stake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stake::All => write!(f, "all"),
            Stake::Points(n) => write!(f, "{}", n),
        }
    }
}

/// Outcome band of a resolved bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetBand {
    Jackpot,
    Win,
    Loss,
}

impl fmt::Display for BetBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetBand::Jackpot => write!(f, "jackpot"),
            BetBand::Win => write!(f, "win"),
            BetBand::Loss => write!(f, "loss"),
        }
    }
}

/// A settled bet: the roll, the band it fell in, and the applied delta.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BetOutcome {
    /// Unique id for log correlation.
    pub bet_id: String,
    pub account_id: AccountId,
    pub roll: u8,
    pub band: BetBand,
    pub stake: i64,
    pub delta: i64,
    pub new_balance: i64,
}

/// Decide the band and signed balance delta for a roll.
///
/// `roll == 100` pays triple, `roll <= 50` loses the stake, anything else
/// wins `floor(1.5 x stake)`. Settlement arithmetic is checked like
/// `Ledger::adjust`; a payout that does not fit in `i64` is rejected as
/// `InvalidArgument`.
pub fn settle(roll: u8, stake: i64) -> LedgerResult<(BetBand, i64)> {
    let overflow =
        || LedgerError::InvalidArgument(format!("payout for stake {} overflows", stake));
    if roll == ROLL_MAX {
        let delta = stake.checked_mul(JACKPOT_MULTIPLIER).ok_or_else(overflow)?;
        Ok((BetBand::Jackpot, delta))
    } else if roll <= LOSS_CEILING {
        let delta = stake.checked_neg().ok_or_else(overflow)?;
        Ok((BetBand::Loss, delta))
    } else {
        let delta = stake.checked_add(stake / 2).ok_or_else(overflow)?;
        Ok((BetBand::Win, delta))
    }
}

/// Validate the stake, draw one roll in `0..=100`, and settle it through
/// `Ledger::adjust`.
///
/// An all-in stake is capped at `max_all_in` and rejected on an empty
/// balance. The settlement adjust can still fail with `InsufficientFunds`
/// if a concurrent debit drains the account between validation and the
/// draw; the bet then has no effect. A stake whose payout would overflow
/// is likewise rejected after the draw, balance untouched.
pub fn resolve_bet<R: Rng>(
    ledger: &Ledger,
    account_id: &AccountId,
    stake: Stake,
    max_all_in: i64,
    rng: &mut R,
) -> LedgerResult<BetOutcome> {
    let balance = ledger.balance_of(account_id)?;
    let stake = match stake {
        Stake::All => {
            if balance == 0 {
                return Err(LedgerError::InvalidArgument(
                    "cannot go all in on an empty balance".to_string(),
                ));
            }
            balance.min(max_all_in)
        }
        Stake::Points(points) => {
            if points <= 0 {
                return Err(LedgerError::InvalidArgument(format!(
                    "stake must be positive, got {}",
                    points
                )));
            }
            if points > balance {
                return Err(LedgerError::InsufficientFunds {
                    id: account_id.clone(),
                    balance,
                    requested: points,
                });
            }
            points
        }
    };

    let roll = rng.gen_range(0..=ROLL_MAX);
    let (band, delta) = settle(roll, stake)?;
    let new_balance = ledger.adjust(account_id, delta)?;

    Ok(BetOutcome {
        bet_id: Uuid::new_v4().to_string(),
        account_id: account_id.clone(),
        roll,
        band,
        stake,
        delta,
        new_balance,
    })
}

/// Move points between two accounts. Self-gifts and non-positive amounts
/// are rejected here with caller-facing messages; `Ledger::transfer`
/// enforces the same rules underneath.
pub fn gift(
    ledger: &Ledger,
    from: &AccountId,
    to: &AccountId,
    amount: i64,
) -> LedgerResult<(i64, i64)> {
    if from == to {
        return Err(LedgerError::InvalidArgument(
            "cannot gift points to yourself".to_string(),
        ));
    }
    if amount <= 0 {
        return Err(LedgerError::InvalidArgument(format!(
            "gift amount must be positive, got {}",
            amount
        )));
    }
    ledger.transfer(from, to, amount)
}

/// Elevated-capability credit. Additive only; it can never fail for
/// insufficient funds.
pub fn grant(ledger: &Ledger, to: &AccountId, amount: i64) -> LedgerResult<i64> {
    if amount <= 0 {
        return Err(LedgerError::InvalidArgument(format!(
            "grant amount must be positive, got {}",
            amount
        )));
    }
    ledger.adjust(to, amount)
}

/// Credit every account through its own atomic adjust. The id list is
/// collected up front so no map shard stays locked across adjusts, and a
/// concurrent transfer or bet on any account interleaves safely. Returns
/// the number of accounts credited.
pub fn accrue_all(ledger: &Ledger, amount_per_account: i64) -> usize {
    if amount_per_account <= 0 {
        return 0;
    }
    let mut credited = 0;
    for id in ledger.ids() {
        if ledger.adjust(&id, amount_per_account).is_ok() {
            credited += 1;
        }
    }
    credited
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AccountId {
        AccountId::from(s)
    }

    #[test]
    fn test_settle_bands_at_stake_100() {
        assert_eq!(settle(100, 100).unwrap(), (BetBand::Jackpot, 300));
        assert_eq!(settle(0, 100).unwrap(), (BetBand::Loss, -100));
        assert_eq!(settle(50, 100).unwrap(), (BetBand::Loss, -100));
        assert_eq!(settle(51, 100).unwrap(), (BetBand::Win, 150));
        assert_eq!(settle(99, 100).unwrap(), (BetBand::Win, 150));
    }

    #[test]
    fn test_settle_truncates_win_payout() {
        // floor(1.5 x 5) = 7, never 7.5
        assert_eq!(settle(75, 5).unwrap(), (BetBand::Win, 7));
        assert_eq!(settle(75, 1).unwrap(), (BetBand::Win, 1));
    }

    #[test]
    fn test_settle_rejects_unpayable_stakes() {
        assert!(matches!(
            settle(100, i64::MAX),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            settle(75, i64::MAX),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            settle(10, i64::MIN),
            Err(LedgerError::InvalidArgument(_))
        ));
        // The loss band stays payable at the extreme; only credits can
        // outgrow i64.
        assert_eq!(settle(0, i64::MAX).unwrap(), (BetBand::Loss, -i64::MAX));
        // Largest stake a jackpot can pay.
        assert_eq!(
            settle(100, i64::MAX / 3).unwrap(),
            (BetBand::Jackpot, i64::MAX - 1)
        );
    }

    #[test]
    fn test_stake_parsing() {
        assert_eq!("all".parse::<Stake>().unwrap(), Stake::All);
        assert_eq!("ALL".parse::<Stake>().unwrap(), Stake::All);
        assert_eq!(" 250 ".parse::<Stake>().unwrap(), Stake::Points(250));
        assert!(matches!(
            "half".parse::<Stake>(),
            Err(LedgerError::InvalidArgument(_))
        ));
        // Negative amounts parse; resolve_bet rejects them.
        assert_eq!("-5".parse::<Stake>().unwrap(), Stake::Points(-5));
    }

    #[test]
    fn test_resolve_bet_delta_matches_band() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 10_000);
        let mut rng = rand::thread_rng();

        for _ in 0..200 {
            let before = ledger.balance_of(&id("alice")).unwrap();
            let outcome =
                resolve_bet(&ledger, &id("alice"), Stake::Points(100), 250_000, &mut rng).unwrap();
            assert!(outcome.roll <= 100);
            match outcome.band {
                BetBand::Jackpot => assert_eq!(outcome.delta, 300),
                BetBand::Win => assert_eq!(outcome.delta, 150),
                BetBand::Loss => assert_eq!(outcome.delta, -100),
            }
            assert_eq!(outcome.stake, 100);
            assert_eq!(outcome.new_balance, before + outcome.delta);
            if ledger.balance_of(&id("alice")).unwrap() < 100 {
                break;
            }
        }
    }

    #[test]
    fn test_resolve_bet_rejects_non_positive_stakes() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 1_000);
        let mut rng = rand::thread_rng();

        assert!(matches!(
            resolve_bet(&ledger, &id("alice"), Stake::Points(0), 250_000, &mut rng),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve_bet(&ledger, &id("alice"), Stake::Points(-10), 250_000, &mut rng),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(ledger.balance_of(&id("alice")).unwrap(), 1_000);
    }

    #[test]
    fn test_resolve_bet_rejects_stake_over_balance() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 99);
        let mut rng = rand::thread_rng();

        let err =
            resolve_bet(&ledger, &id("alice"), Stake::Points(100), 250_000, &mut rng).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(ledger.balance_of(&id("alice")).unwrap(), 99);
    }

    #[test]
    fn test_resolve_bet_rejects_overflowing_payout() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("midas"), "Midas", i64::MAX);
        let mut rng = rand::thread_rng();

        let mut rejected = false;
        for _ in 0..200 {
            match resolve_bet(&ledger, &id("midas"), Stake::Points(i64::MAX), i64::MAX, &mut rng)
            {
                Err(LedgerError::InvalidArgument(_)) => {
                    rejected = true;
                    break;
                }
                // Only the loss band can settle a stake this large; refill
                // and keep drawing until a credit band comes up.
                Ok(outcome) => {
                    assert_eq!(outcome.band, BetBand::Loss);
                    ledger.adjust(&id("midas"), i64::MAX).unwrap();
                }
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert!(rejected);
        assert_eq!(ledger.balance_of(&id("midas")).unwrap(), i64::MAX);
    }

    #[test]
    fn test_bet_outcome_carries_a_parseable_bet_id() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 1_000);
        let mut rng = rand::thread_rng();
        let outcome =
            resolve_bet(&ledger, &id("alice"), Stake::Points(10), 250_000, &mut rng).unwrap();

        assert!(Uuid::parse_str(&outcome.bet_id).is_ok());
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains(outcome.bet_id.as_str()));
    }

    #[test]
    fn test_all_in_uses_balance_up_to_cap() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 500);
        let mut rng = rand::thread_rng();
        let outcome = resolve_bet(&ledger, &id("alice"), Stake::All, 250_000, &mut rng).unwrap();
        assert_eq!(outcome.stake, 500);

        ledger.get_or_create(&id("whale"), "Whale", 1_000_000);
        let outcome = resolve_bet(&ledger, &id("whale"), Stake::All, 250_000, &mut rng).unwrap();
        assert_eq!(outcome.stake, 250_000);
    }

    #[test]
    fn test_all_in_on_empty_balance_is_invalid() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 0);
        let mut rng = rand::thread_rng();
        assert!(matches!(
            resolve_bet(&ledger, &id("alice"), Stake::All, 250_000, &mut rng),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_resolve_bet_unknown_account() {
        let ledger = Ledger::new();
        let mut rng = rand::thread_rng();
        assert!(matches!(
            resolve_bet(&ledger, &id("ghost"), Stake::Points(10), 250_000, &mut rng),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_gift_moves_points_and_validates() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("alice"), "Alice", 1_000);
        ledger.get_or_create(&id("bob"), "Bob", 0);

        assert_eq!(gift(&ledger, &id("alice"), &id("bob"), 400).unwrap(), (600, 400));
        assert!(matches!(
            gift(&ledger, &id("alice"), &id("alice"), 10),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            gift(&ledger, &id("alice"), &id("bob"), 0),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_grant_is_additive_only() {
        let ledger = Ledger::new();
        ledger.get_or_create(&id("bob"), "Bob", 10);
        assert_eq!(grant(&ledger, &id("bob"), 990).unwrap(), 1_000);
        assert!(matches!(
            grant(&ledger, &id("bob"), -5),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            grant(&ledger, &id("bob"), 0),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_accrue_all_on_empty_ledger_is_noop() {
        let ledger = Ledger::new();
        assert_eq!(accrue_all(&ledger, 250), 0);
    }

    #[test]
    fn test_accrue_all_credits_every_account() {
        let ledger = Ledger::new();
        for name in ["alice", "bob", "carol"] {
            ledger.get_or_create(&id(name), name, 1_000);
        }
        assert_eq!(accrue_all(&ledger, 250), 3);
        for name in ["alice", "bob", "carol"] {
            assert_eq!(ledger.balance_of(&id(name)).unwrap(), 1_250);
        }
    }
}
