//! Typed command boundary
//!
//! The external façade (a chat frontend, an RPC server) translates user
//! input into `Request` values and renders `Response` values; the core
//! never formats its own output beyond thousands-separated balance
//! strings. Any contact creates the caller's account with the configured
//! starting balance, and commands that name another party create that
//! party's account the same way.

use crate::account::{Account, AccountId};
use crate::config::ScripConfig;
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::wager::{self, BetOutcome, Stake};
use serde::{Deserialize, Serialize};

/// An identified participant as supplied by the façade.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Party {
    pub id: AccountId,
    pub display_name: String,
}

/// Per-invocation caller identity and capability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Caller {
    pub id: AccountId,
    pub display_name: String,
    /// Single elevated-capability flag; gates `Grant`.
    pub elevated: bool,
}

impl Caller {
    pub fn new(id: impl Into<AccountId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            elevated: false,
        }
    }

    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }
}

/// Commands accepted by the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    /// Balance of the caller, or of another party if given.
    Balance { target: Option<Party> },
    /// Wager the stake on one roll.
    Bet { stake: Stake },
    /// Move points from the caller to another party.
    Gift { to: Party, amount: i64 },
    /// Credit points out of thin air. Elevated capability only.
    Grant { to: Party, amount: i64 },
    /// Leaderboard of the highest balances.
    Top { limit: usize },
}

/// Results returned to the façade for rendering.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Balance {
        account: Account,
        pretty_balance: String,
    },
    Bet {
        outcome: BetOutcome,
        pretty_balance: String,
    },
    Gift {
        from_balance: i64,
        to_balance: i64,
    },
    Grant {
        new_balance: i64,
    },
    Top {
        entries: Vec<TopEntry>,
    },
}

/// One leaderboard row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopEntry {
    pub rank: usize,
    pub id: AccountId,
    pub display_name: String,
    pub balance: i64,
}

/// Execute one command against the ledger.
pub fn dispatch(
    ledger: &Ledger,
    config: &ScripConfig,
    caller: &Caller,
    request: Request,
) -> LedgerResult<Response> {
    let starting = config.ledger.starting_balance;
    ledger.get_or_create(&caller.id, &caller.display_name, starting);

    match request {
        Request::Balance { target } => {
            let account = match target {
                Some(party) => ledger.get_or_create(&party.id, &party.display_name, starting),
                None => ledger.get_or_create(&caller.id, &caller.display_name, starting),
            };
            let pretty_balance = format_points(account.balance);
            Ok(Response::Balance {
                account,
                pretty_balance,
            })
        }
        Request::Bet { stake } => {
            let mut rng = rand::thread_rng();
            let outcome = wager::resolve_bet(
                ledger,
                &caller.id,
                stake,
                config.wager.max_all_in,
                &mut rng,
            )?;
            Ok(Response::Bet {
                pretty_balance: format_points(outcome.new_balance),
                outcome,
            })
        }
        Request::Gift { to, amount } => {
            ledger.get_or_create(&to.id, &to.display_name, starting);
            let (from_balance, to_balance) = wager::gift(ledger, &caller.id, &to.id, amount)?;
            Ok(Response::Gift {
                from_balance,
                to_balance,
            })
        }
        Request::Grant { to, amount } => {
            if !caller.elevated {
                return Err(LedgerError::InvalidArgument(
                    "grant requires the elevated capability".to_string(),
                ));
            }
            ledger.get_or_create(&to.id, &to.display_name, starting);
            let new_balance = wager::grant(ledger, &to.id, amount)?;
            Ok(Response::Grant { new_balance })
        }
        Request::Top { limit } => {
            let entries = ledger
                .top(limit)?
                .into_iter()
                .map(|(account, rank)| TopEntry {
                    rank,
                    id: account.id,
                    display_name: account.display_name,
                    balance: account.balance,
                })
                .collect();
            Ok(Response::Top { entries })
        }
    }
}

/// Render a point amount with thousands separators: `12345` becomes
/// `"12,345"`.
pub fn format_points(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
