//! scripd - ledger service daemon
//!
//! Loads the configuration, starts the ledger service, and runs until
//! interrupted. An optional local simulation exercises the concurrent
//! command paths against the live ledger.

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scrip::account::AccountId;
use scrip::commands::{self, Caller, Party, Request};
use scrip::config::ScripConfig;
use scrip::service::LedgerService;
use scrip::wager::Stake;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scripd")]
#[command(about = "Concurrent points ledger with durable checkpointing", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the snapshot file path (file backend)
    #[arg(long)]
    snapshot_path: Option<String>,

    /// Override the database directory (rocksdb backend)
    #[arg(long)]
    data_dir: Option<String>,

    /// Spawn this many local simulation workers
    #[arg(long, default_value = "0")]
    simulate: usize,

    /// Seconds between stats log lines
    #[arg(long, default_value = "60")]
    stats_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ScripConfig::load(path)?,
        None => ScripConfig::default(),
    };
    if let Some(path) = args.snapshot_path {
        config.storage.path = path;
    }
    if let Some(dir) = args.data_dir {
        config.storage.data_dir = dir;
    }

    println!("🪙 scripd starting");
    let service = LedgerService::start(config).await?;
    println!("✅ ledger ready with {} accounts", service.ledger().len());

    if args.simulate > 0 {
        spawn_simulation(&service, args.simulate);
    }

    let mut stats_ticker = tokio::time::interval(Duration::from_secs(args.stats_interval.max(1)));
    stats_ticker.tick().await;
    let shutdown_signal = tokio::signal::ctrl_c();
    tokio::pin!(shutdown_signal);

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => break,
            _ = stats_ticker.tick() => {
                let stats = service.stats();
                info!(
                    accounts = stats.accounts,
                    total_points = stats.total_points,
                    flushes = stats.flushes,
                    flush_failures = stats.flush_failures,
                    "ledger stats"
                );
            }
        }
    }

    println!("🛑 scripd shutting down");
    service.shutdown().await?;
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scrip=info")),
        )
        .init();
}

/// Detached workers issuing random commands against the live ledger.
/// Refused bets and self-gifts are part of normal traffic here; only
/// store-level failures are worth a log line.
fn spawn_simulation(service: &LedgerService, workers: usize) {
    println!("🎲 spawning {} simulation workers", workers);
    for worker in 0..workers {
        let ledger = service.ledger();
        let config = service.config().clone();
        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let caller = Caller::new(format!("sim-{}", worker), format!("Sim {}", worker));
            let neighbor = (worker + 1) % workers;
            loop {
                let request = match rng.gen_range(0..4) {
                    0 => Request::Balance { target: None },
                    1 => Request::Bet {
                        stake: Stake::Points(rng.gen_range(1..200)),
                    },
                    2 => Request::Gift {
                        to: Party {
                            id: AccountId::from(format!("sim-{}", neighbor)),
                            display_name: format!("Sim {}", neighbor),
                        },
                        amount: rng.gen_range(1..50),
                    },
                    _ => Request::Top { limit: 5 },
                };
                if let Err(err) = commands::dispatch(&ledger, &config, &caller, request) {
                    if !err.is_caller_error() {
                        warn!(worker, error = %err, "simulation command failed");
                    }
                }
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        });
    }
}
