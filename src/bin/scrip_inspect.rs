//! Offline snapshot inspector.
//!
//! Opens the configured snapshot store and prints its contents without
//! starting the service. For the rocksdb backend the daemon must not be
//! holding the database open.

use clap::Parser;
use scrip::commands::format_points;
use scrip::config::ScripConfig;
use scrip::store;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scrip-inspect")]
#[command(about = "Print the persisted ledger snapshot", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ScripConfig::load(path)?,
        None => ScripConfig::default(),
    };

    let store = store::open(&config.storage)?;
    println!("🔍 Ledger Snapshot Inspector");
    println!("============================");
    println!("Store: {}\n", store.describe());

    match store.load().await? {
        None => println!("No snapshot present."),
        Some(mut accounts) => {
            accounts.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.id.cmp(&b.id)));
            let total: i64 = accounts.iter().map(|a| a.balance).sum();
            println!("{:<4} {:<24} {:<24} {:>16}", "#", "id", "name", "balance");
            for (idx, account) in accounts.iter().enumerate() {
                println!(
                    "{:<4} {:<24} {:<24} {:>16}",
                    idx + 1,
                    account.id,
                    account.display_name,
                    format_points(account.balance)
                );
            }
            println!(
                "\n{} accounts, {} points total",
                accounts.len(),
                format_points(total)
            );
        }
    }
    Ok(())
}
