use std::fmt;

use crate::engine::account::AccountId;
use crate::engine::command::CommandRecord;
use crate::engine::prn::{PrnId, PrnStatus};
use crate::engine::transaction::{TransactionId, TransactionStatus};
use crate::engine::Decimal;

/// Top-level error type for batch processing.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

/// Errors during `CommandRecord` -> `Command` conversion (hard errors).
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid command: {0}")]
    InvalidCommand(CommandRecord),
}

/// The entity an `AlreadyTerminal` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Transaction(TransactionId, TransactionStatus),
    Prn(PrnId, PrnStatus),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Transaction(tx, status) => write!(f, "transaction {tx} ({status})"),
            Subject::Prn(prn, status) => write!(f, "PRN {prn} ({status})"),
        }
    }
}

/// Errors returned by the ledger engine.
///
/// Every one of these is raised before any state is written, with the
/// exception of the commit-time failures (`StaleBalance`, and `AccountClosed`
/// or `PrnNotAvailable` raised by a commit) which also mark the transaction
/// `failed`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Account {account} not found")]
    AccountNotFound { account: AccountId },

    #[error("Account {account} already exists")]
    AccountAlreadyExists { account: AccountId },

    #[error("Account {account} is closed")]
    AccountClosed { account: AccountId },

    #[error("Account {account} has {transactions} transaction(s) on record and cannot be removed")]
    AccountHasHistory {
        account: AccountId,
        transactions: usize,
    },

    #[error("Invalid amount {amount}: must be positive with at most 2 decimal places")]
    InvalidAmount { amount: Decimal },

    #[error("Insufficient funds: account {account} has {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("Balance overflow on account {account}: {balance} cannot absorb {amount}")]
    BalanceOverflow {
        account: AccountId,
        balance: Decimal,
        amount: Decimal,
    },

    #[error("Reap timeout {timeout:?} reaches past the earliest representable time")]
    TimeoutOutOfRange { timeout: std::time::Duration },

    #[error("PRN {prn} not found")]
    PrnNotFound { prn: PrnId },

    #[error("PRN {prn} is not available: {reason}")]
    PrnNotAvailable { prn: PrnId, reason: String },

    #[error("PRN number {number} is already issued")]
    DuplicatePrn { number: String },

    #[error("Transaction {tx} not found")]
    TransactionNotFound { tx: TransactionId },

    #[error("Stale balance on transaction {tx}: opened against {expected}, account now holds {actual}")]
    StaleBalance {
        tx: TransactionId,
        expected: Decimal,
        actual: Decimal,
    },

    #[error("{0} is already terminal")]
    AlreadyTerminal(Subject),

    #[error("Balance mismatch on account {account}: stored {stored}, replayed {replayed}")]
    BalanceMismatch {
        account: AccountId,
        stored: Decimal,
        replayed: Decimal,
    },

    #[error("Broken chain on account {account} at transaction {tx}")]
    BrokenChain {
        account: AccountId,
        tx: TransactionId,
    },
}

impl LedgerError {
    /// Whether the caller should reissue the operation through a fresh
    /// `open_transaction`.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::StaleBalance { .. })
    }
}

/// Soft errors during batch processing.
/// These don't stop batch processing, we log and continue.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Transaction label {label} is already in use")]
    DuplicateLabel { label: u64 },

    #[error("Transaction label {label} was never opened")]
    UnknownLabel { label: u64 },

    #[error("PRN number {number} was never issued")]
    UnknownPrn { number: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_stale_balance_is_retryable() {
        let stale = LedgerError::StaleBalance {
            tx: 1,
            expected: dec!(100),
            actual: dec!(70),
        };
        assert!(stale.is_retryable());
        assert!(!LedgerError::AccountNotFound { account: 1 }.is_retryable());
        assert!(!LedgerError::InvalidAmount { amount: dec!(-1) }.is_retryable());
    }

    #[test]
    fn test_already_terminal_message_names_the_subject() {
        let err = LedgerError::AlreadyTerminal(Subject::Prn(7, PrnStatus::Paid));
        assert_eq!(err.to_string(), "PRN 7 (paid) is already terminal");

        let err = LedgerError::AlreadyTerminal(Subject::Transaction(3, TransactionStatus::Failed));
        assert_eq!(err.to_string(), "transaction 3 (failed) is already terminal");
    }
}
