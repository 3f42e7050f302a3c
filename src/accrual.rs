//! Scheduled income accrual
//!
//! Credits every account on a fixed interval. Each credit is its own
//! atomic adjust, so the task interleaves safely with concurrent bets and
//! transfers and never holds a ledger-wide lock.

use crate::ledger::Ledger;
use crate::wager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::debug;

pub struct IncomeTask {
    ledger: Arc<Ledger>,
    amount: i64,
    cycle: Duration,
}

impl IncomeTask {
    pub fn new(ledger: Arc<Ledger>, amount: i64, cycle: Duration) -> Self {
        Self {
            ledger,
            amount,
            cycle,
        }
    }

    /// Run the accrual loop until the shutdown signal.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.cycle);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the immediate first tick; accounts should earn a full cycle
        // before their first credit.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let credited = wager::accrue_all(&self.ledger, self.amount);
                    debug!(accounts = credited, amount = self.amount, "income accrued");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}
