//! Periodic durable checkpointing
//!
//! The checkpointer loads the snapshot once at startup and then flushes
//! one consistent copy of the ledger through the store on a fixed
//! interval, plus once more on shutdown. A failed flush is logged and
//! retried on the next tick; it never takes the process down and never
//! blocks command processing, which runs entirely in memory.

use crate::errors::{LedgerResult, StoreError};
use crate::ledger::Ledger;
use crate::store::SnapshotStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info};

pub struct Checkpointer {
    ledger: Arc<Ledger>,
    store: Arc<dyn SnapshotStore>,
    flush_interval: Duration,
    flushes: AtomicU64,
    failures: AtomicU64,
    last_flush_accounts: AtomicU64,
}

impl Checkpointer {
    pub fn new(
        ledger: Arc<Ledger>,
        store: Arc<dyn SnapshotStore>,
        flush_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            store,
            flush_interval,
            flushes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            last_flush_accounts: AtomicU64::new(0),
        }
    }

    /// Rehydrate a ledger from the durable snapshot. A missing snapshot
    /// starts an empty ledger; an unreadable one is an error the caller
    /// must treat as fatal.
    pub async fn load(store: &dyn SnapshotStore) -> Result<Ledger, StoreError> {
        match store.load().await? {
            Some(accounts) => {
                info!(accounts = accounts.len(), "loaded ledger snapshot");
                Ok(Ledger::from_snapshot(accounts))
            }
            None => {
                info!("no ledger snapshot found, starting empty");
                Ok(Ledger::new())
            }
        }
    }

    /// Write one consistent snapshot through the store. Returns the number
    /// of accounts persisted.
    pub async fn flush(&self) -> LedgerResult<usize> {
        let accounts = self.ledger.snapshot();
        let count = accounts.len();
        self.store.replace_all(&accounts).await?;
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.last_flush_accounts
            .store(count as u64, Ordering::SeqCst);
        Ok(count)
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Account count written by the most recent successful flush.
    pub fn last_flush_accounts(&self) -> u64 {
        self.last_flush_accounts.load(Ordering::SeqCst)
    }

    /// Run the periodic flush loop until the shutdown signal, then write
    /// the final checkpoint.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; the ledger was loaded from
        // this store moments ago, so skip it.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush_and_log().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        match self.flush().await {
            Ok(count) => info!(accounts = count, "final checkpoint written"),
            Err(err) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                error!(error = %err, "final checkpoint failed");
            }
        }
    }

    async fn flush_and_log(&self) {
        let started = Instant::now();
        match self.flush().await {
            Ok(count) => {
                debug!(
                    accounts = count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "checkpoint written"
                );
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                error!(error = %err, "checkpoint failed, retrying next tick");
            }
        }
    }
}
