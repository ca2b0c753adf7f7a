pub(crate) use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "balance-ledger",
    author,
    version,
    about = "Append-only balance ledger with staged commits and payment references",
    long_about = None,
    after_help = "OUTPUT:\n    Account balances are printed to stdout in CSV format.\n    Use shell redirection to save to a file:\n\n    balance-ledger commands.csv > accounts.csv"
)]
pub struct Args {
    /// Path to the input commands CSV file
    #[arg(
        index = 1,
        value_name = "FILE",
        help = "Input CSV file with columns: type, account, tx, amount, prn"
    )]
    pub input_file: PathBuf,

    /// Also write the transaction log to this file
    #[arg(long, value_name = "FILE")]
    pub transactions: Option<PathBuf>,

    /// Fail transactions left pending for longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub reap_after: Option<u64>,

    /// Allow debits to take an account below zero
    #[arg(long)]
    pub allow_overdraft: bool,
}
