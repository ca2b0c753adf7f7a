mod commands;

use anyhow::{bail, Context, Result};
use balance_ledger::{Ledger, LedgerConfig};
use clap::Parser;
use commands::Args;

fn main() -> Result<()> {
    // Parse the CLI arguments
    let args = Args::parse();

    // Initialize logger with default level of info (can be overridden with RUST_LOG)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 1. Initialize the Ledger
    let ledger = Ledger::with_config(LedgerConfig {
        allow_overdraft: args.allow_overdraft,
    });

    // 2. Open and process the input file
    log::info!("Processing commands from {}", args.input_file.display());
    let file = std::fs::File::open(&args.input_file)
        .with_context(|| format!("Failed to open input file: {}", args.input_file.display()))?;

    ledger
        .process_commands(file)
        .context("Failed to process commands")?;

    // 3. Sweep abandoned pending transactions
    if let Some(secs) = args.reap_after {
        ledger
            .reap_pending(std::time::Duration::from_secs(secs))
            .context("Failed to reap pending transactions")?;
    }

    let violations = ledger.audit();
    if !violations.is_empty() {
        bail!("Ledger audit found {} violation(s)", violations.len());
    }

    // 4. Export the transaction log if requested
    if let Some(path) = &args.transactions {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create transaction log: {}", path.display()))?;
        ledger
            .export_transactions(file)
            .context("Failed to export transactions")?;
    }

    // 5. Export the accounts to stdout
    ledger
        .export_accounts(std::io::stdout())
        .context("Failed to export accounts to stdout")?;

    log::info!("Export complete");

    Ok(())
}
