//! Service assembly
//!
//! Builds the configured snapshot store, performs the startup load, and
//! owns the background tasks and the shutdown path. A corrupt snapshot
//! fails startup; a missing one starts an empty ledger.

use crate::accrual::IncomeTask;
use crate::checkpoint::Checkpointer;
use crate::config::ScripConfig;
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::store;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Runtime counters exposed for logging and inspection.
#[derive(Clone, Debug)]
pub struct ServiceStats {
    pub accounts: usize,
    pub total_points: i64,
    pub flushes: u64,
    pub flush_failures: u64,
    pub last_flush_accounts: u64,
}

/// A running ledger service: shared ledger plus the checkpoint and income
/// tasks.
pub struct LedgerService {
    config: ScripConfig,
    ledger: Arc<Ledger>,
    checkpointer: Arc<Checkpointer>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl LedgerService {
    /// Validate the configuration, load the snapshot, and start the
    /// background tasks.
    pub async fn start(config: ScripConfig) -> LedgerResult<Self> {
        config
            .validate()
            .map_err(|e| LedgerError::InvalidArgument(e.to_string()))?;

        let snapshot_store = store::open(&config.storage)?;
        info!(store = %snapshot_store.describe(), "starting ledger service");

        let ledger = Arc::new(Checkpointer::load(snapshot_store.as_ref()).await?);
        info!(
            accounts = ledger.len(),
            total_points = ledger.total_points(),
            "ledger ready"
        );

        let (shutdown, shutdown_rx) = watch::channel(false);
        let checkpointer = Arc::new(Checkpointer::new(
            Arc::clone(&ledger),
            snapshot_store,
            config.checkpoint_interval(),
        ));
        let income = Arc::new(IncomeTask::new(
            Arc::clone(&ledger),
            config.accrual.amount,
            config.accrual_interval(),
        ));

        let tasks = vec![
            tokio::spawn(Arc::clone(&checkpointer).run(shutdown_rx.clone())),
            tokio::spawn(income.run(shutdown_rx)),
        ];

        Ok(Self {
            config,
            ledger,
            checkpointer,
            shutdown,
            tasks,
        })
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.ledger)
    }

    pub fn config(&self) -> &ScripConfig {
        &self.config
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            accounts: self.ledger.len(),
            total_points: self.ledger.total_points(),
            flushes: self.checkpointer.flush_count(),
            flush_failures: self.checkpointer.failure_count(),
            last_flush_accounts: self.checkpointer.last_flush_accounts(),
        }
    }

    /// Signal the background tasks and wait for them; the checkpoint task
    /// writes the final snapshot before it exits.
    pub async fn shutdown(self) -> LedgerResult<()> {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(err) = task.await {
                error!(error = %err, "background task failed during shutdown");
            }
        }
        info!("ledger service stopped");
        Ok(())
    }
}
