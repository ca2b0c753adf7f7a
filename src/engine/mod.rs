//! Ledger engine module.
//!
//! This module contains the balance ledger and its batch front end:
//! - `Ledger` - Accounts, the transaction log and PRNs behind per-account locks
//! - `Transaction` - Staged log entries (credit, debit, refund, adjustment)
//! - `Prn` - Payment references settled by exactly one commit
//! - `BatchProcessor` - CSV command streams applied to a ledger
//! - `Error` types - Ledger, command and processing errors

mod account;
mod book;
mod command;
mod error;
mod export;
mod ledger;
mod prn;
mod processor;
mod transaction;

pub use rust_decimal::Decimal;

pub use account::{Account, AccountId, AccountStatus};
pub use command::{
    AccountAction, AccountCommand, Command, CommandRecord, CommandType, Label, Posting, PrnAction,
    PrnCommand, Settlement, SettlementAction,
};
pub use error::{CommandError, Error, LedgerError, ProcessingError, Subject};
pub use ledger::{Ledger, LedgerConfig};
pub use prn::{Prn, PrnId, PrnStatus};
pub use processor::{BatchProcessor, BatchSummary, BATCH_FAIL_REASON};
pub use transaction::{
    Direction, Transaction, TransactionId, TransactionKind, TransactionStatus, SCALE,
};
