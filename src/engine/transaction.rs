use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::account::{serialize_decimal_2dp, AccountId};
use super::error::{LedgerError, Subject};
use super::prn::PrnId;
use super::Decimal;

pub type TransactionId = u64;

/// Fractional digits allowed on amounts and balances.
pub const SCALE: u32 = 2;

/// Direction of a manual balance adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Credit,
    Debit,
    Refund,
    Adjustment(Direction),
}

impl TransactionKind {
    /// Apply the kind's sign convention to a positive amount.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionKind::Credit
            | TransactionKind::Refund
            | TransactionKind::Adjustment(Direction::Increase) => amount,
            TransactionKind::Debit | TransactionKind::Adjustment(Direction::Decrease) => -amount,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Credit => write!(f, "credit"),
            TransactionKind::Debit => write!(f, "debit"),
            TransactionKind::Refund => write!(f, "refund"),
            TransactionKind::Adjustment(Direction::Increase) => write!(f, "adjustment+"),
            TransactionKind::Adjustment(Direction::Decrease) => write!(f, "adjustment-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Validate a caller-supplied amount: positive, at most [`SCALE`] decimals.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    let amount = amount.normalize();
    if amount <= Decimal::ZERO || amount.scale() > SCALE {
        return Err(LedgerError::InvalidAmount { amount });
    }
    Ok(amount)
}

/// One entry of the transaction log.
///
/// Created `Pending` with balance snapshots taken at open time. Moves to
/// `Completed` or `Failed` exactly once and is immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    transaction_id: TransactionId,
    account_id: AccountId,
    kind: TransactionKind,
    amount: Decimal,
    balance_before: Decimal,
    balance_after: Decimal,
    created_at: DateTime<Utc>,
    prn_id: Option<PrnId>,
    status: TransactionStatus,
    failure_reason: Option<String>,
    /// Commit counter of the account when this transaction was opened.
    base_version: u64,
}

impl Transaction {
    /// Stage a pending transaction against `balance_before`.
    ///
    /// Fails with `BalanceOverflow` if the resulting balance is not
    /// representable.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn open(
        transaction_id: TransactionId,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        balance_before: Decimal,
        prn_id: Option<PrnId>,
        base_version: u64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let balance_after = balance_before
            .checked_add(kind.signed(amount))
            .ok_or(LedgerError::BalanceOverflow {
                account: account_id,
                balance: balance_before,
                amount,
            })?
            .normalize();

        Ok(Self {
            transaction_id,
            account_id,
            kind,
            amount,
            balance_before,
            balance_after,
            created_at,
            prn_id,
            status: TransactionStatus::Pending,
            failure_reason: None,
            base_version,
        })
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Signed effect of this transaction on the account balance
    pub fn delta(&self) -> Decimal {
        self.kind.signed(self.amount)
    }

    pub fn balance_before(&self) -> Decimal {
        self.balance_before
    }

    pub fn balance_after(&self) -> Decimal {
        self.balance_after
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn prn_id(&self) -> Option<PrnId> {
        self.prn_id
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    pub(super) fn base_version(&self) -> u64 {
        self.base_version
    }

    pub(super) fn ensure_pending(&self) -> Result<(), LedgerError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(LedgerError::AlreadyTerminal(Subject::Transaction(
                self.transaction_id,
                self.status,
            )))
        }
    }

    /// # Panics (debug only)
    /// Panics if the transaction is not pending.
    pub(super) fn complete(&mut self) {
        debug_assert!(self.is_pending(), "complete called on {} transaction", self.status);
        self.status = TransactionStatus::Completed;
    }

    /// # Panics (debug only)
    /// Panics if the transaction is not pending.
    pub(super) fn fail(&mut self, reason: impl Into<String>) {
        debug_assert!(self.is_pending(), "fail called on {} transaction", self.status);
        self.status = TransactionStatus::Failed;
        self.failure_reason = Some(reason.into());
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] account={} tx={} amount={} {} -> {} ({})",
            self.kind,
            self.account_id,
            self.transaction_id,
            self.amount,
            self.balance_before,
            self.balance_after,
            self.status
        )
    }
}

/// Flat row written by the transaction log export.
#[derive(Debug, Serialize)]
pub(super) struct TransactionRow {
    id: TransactionId,
    account: AccountId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(serialize_with = "serialize_decimal_2dp")]
    amount: Decimal,
    #[serde(serialize_with = "serialize_decimal_2dp")]
    balance_before: Decimal,
    #[serde(serialize_with = "serialize_decimal_2dp")]
    balance_after: Decimal,
    date: String,
    prn: Option<PrnId>,
    status: TransactionStatus,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.transaction_id,
            account: tx.account_id,
            kind: tx.kind.to_string(),
            amount: tx.amount,
            balance_before: tx.balance_before,
            balance_after: tx.balance_after,
            date: tx.created_at.to_rfc3339(),
            prn: tx.prn_id,
            status: tx.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn open(kind: TransactionKind, amount: Decimal, before: Decimal) -> Transaction {
        Transaction::open(1, 1, kind, amount, before, None, 0, Utc::now()).unwrap()
    }

    #[test]
    fn test_sign_convention_per_kind() {
        assert_eq!(TransactionKind::Credit.signed(dec!(5)), dec!(5));
        assert_eq!(TransactionKind::Refund.signed(dec!(5)), dec!(5));
        assert_eq!(TransactionKind::Debit.signed(dec!(5)), dec!(-5));
        assert_eq!(
            TransactionKind::Adjustment(Direction::Increase).signed(dec!(5)),
            dec!(5)
        );
        assert_eq!(
            TransactionKind::Adjustment(Direction::Decrease).signed(dec!(5)),
            dec!(-5)
        );
    }

    #[test]
    fn test_open_computes_balance_after() {
        let tx = open(TransactionKind::Debit, dec!(30.00), dec!(100.00));
        assert_eq!(tx.balance_before(), dec!(100));
        assert_eq!(tx.balance_after(), dec!(70));
        assert_eq!(tx.balance_after() - tx.balance_before(), tx.delta());
        assert!(tx.is_pending());
    }

    #[test]
    fn test_open_rejects_unrepresentable_balance() {
        let err = Transaction::open(
            1,
            7,
            TransactionKind::Credit,
            dec!(1),
            Decimal::MAX,
            None,
            0,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::BalanceOverflow {
                account: 7,
                balance: Decimal::MAX,
                amount: dec!(1),
            }
        );

        let err = Transaction::open(
            1,
            7,
            TransactionKind::Debit,
            dec!(1),
            Decimal::MIN,
            None,
            0,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::BalanceOverflow { .. }));
    }

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(dec!(30.00)).unwrap(), dec!(30));
        assert_eq!(validate_amount(dec!(0.01)).unwrap(), dec!(0.01));
        // trailing zeros beyond two places are not extra precision
        assert_eq!(validate_amount(dec!(1.2300)).unwrap(), dec!(1.23));

        assert!(validate_amount(dec!(0.001)).is_err());
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(dec!(-10)).is_err());
    }

    #[test]
    fn test_terminal_transaction_rejects_transitions() {
        let mut tx = open(TransactionKind::Credit, dec!(10), dec!(0));
        tx.fail("declined");

        assert_eq!(tx.status(), TransactionStatus::Failed);
        assert_eq!(tx.failure_reason(), Some("declined"));
        assert_eq!(
            tx.ensure_pending(),
            Err(LedgerError::AlreadyTerminal(Subject::Transaction(
                1,
                TransactionStatus::Failed
            )))
        );
    }

    #[test]
    fn test_display() {
        let tx = open(TransactionKind::Refund, dec!(2.5), dec!(1));
        assert_eq!(tx.to_string(), "[refund] account=1 tx=1 amount=2.5 1 -> 3.5 (pending)");
    }
}
