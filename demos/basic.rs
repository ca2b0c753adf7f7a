//! Basic example of using the `Ledger`.
//!
//! Run with: `cargo run --example basic`

use balance_ledger::{Ledger, TransactionKind};
use rust_decimal::Decimal;
use std::io::Cursor;

fn main() {
    // Initialize logger (optional, but shows what's happening)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Sample commands as CSV
    let commands = r"type,account,tx,amount,prn
register,1,,,
register,2,,,
issue,1,,,PRN-1001
credit,1,1,100.00,PRN-1001
commit,,1,,
debit,1,2,30.00,
commit,,2,,
credit,2,3,50.00,
debit,2,4,20.00,
commit,,4,,
commit,,3,,
debit,2,5,80.00,
adjust,2,6,-5.00,
commit,,6,,
cancel,,,,PRN-1001
";

    let ledger = Ledger::new();
    let summary = ledger
        .process_commands(Cursor::new(commands))
        .expect("Failed to process commands");
    println!("{summary:?}");

    // The same operations through the API
    let tx = ledger
        .open_transaction(1, TransactionKind::Refund, Decimal::new(1250, 2), None)
        .expect("Failed to open refund");
    ledger
        .commit_transaction(tx.transaction_id())
        .expect("Failed to commit refund");

    for account in ledger.accounts() {
        let replayed = ledger
            .replay_balance(account.account_id())
            .expect("Account disappeared");
        println!(
            "account {} balance {} replayed {}",
            account.account_id(),
            account.balance(),
            replayed
        );
    }

    println!("\n=== Final Account State ===");
    ledger
        .export_accounts(std::io::stdout())
        .expect("Failed to export accounts");

    println!("\n=== Transaction Log ===");
    ledger
        .export_transactions(std::io::stdout())
        .expect("Failed to export transactions");
}
