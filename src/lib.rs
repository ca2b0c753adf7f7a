//! An append-only balance ledger.
//!
//! Balances change only by committing staged transactions. Every commit is
//! checked against the balance its transaction was opened with, and the
//! stored balance can always be rebuilt by replaying the log.

pub mod engine;

pub use engine::{
    Account, AccountId, AccountStatus, BatchProcessor, BatchSummary, Decimal, Direction, Error,
    Ledger, LedgerConfig, LedgerError, Prn, PrnId, PrnStatus, Transaction, TransactionId,
    TransactionKind, TransactionStatus,
};
