//! Per-account state: the account row, its slice of the transaction log and
//! the PRNs issued against it. The ledger guards each book with its own mutex,
//! so everything in here runs inside the account's critical section.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::account::{Account, AccountId};
use super::error::LedgerError;
use super::prn::{Prn, PrnId};
use super::transaction::{Transaction, TransactionId, TransactionKind, TransactionStatus};
use super::Decimal;

pub(super) const EXPIRED_PENDING: &str = "expired pending";

#[derive(Debug)]
pub(super) struct AccountBook {
    account: Account,
    transactions: BTreeMap<TransactionId, Transaction>,
    prns: BTreeMap<PrnId, Prn>,
    /// Number of commits applied so far. A transaction may only commit
    /// against the version it was opened at.
    version: u64,
    /// Set once the account is removed from the registry.
    detached: bool,
}

impl AccountBook {
    pub(super) fn new(account_id: AccountId) -> Self {
        Self {
            account: Account::new(account_id),
            transactions: BTreeMap::new(),
            prns: BTreeMap::new(),
            version: 0,
            detached: false,
        }
    }

    pub(super) fn account(&self) -> &Account {
        &self.account
    }

    pub(super) fn account_id(&self) -> AccountId {
        self.account.account_id()
    }

    pub(super) fn is_detached(&self) -> bool {
        self.detached
    }

    pub(super) fn transaction(&self, tx: TransactionId) -> Option<&Transaction> {
        self.transactions.get(&tx)
    }

    pub(super) fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    pub(super) fn prn(&self, prn: PrnId) -> Option<&Prn> {
        self.prns.get(&prn)
    }

    pub(super) fn prns(&self) -> impl Iterator<Item = &Prn> {
        self.prns.values()
    }

    pub(super) fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.account.is_active() {
            Ok(())
        } else {
            Err(LedgerError::AccountClosed {
                account: self.account_id(),
            })
        }
    }

    pub(super) fn close(&mut self) -> Result<(), LedgerError> {
        self.ensure_active()?;
        self.account.close();
        Ok(())
    }

    /// Detach the book so that late callers holding its handle observe the
    /// account as gone. Refused while any transaction is on record.
    pub(super) fn detach(&mut self) -> Result<Vec<Prn>, LedgerError> {
        if !self.transactions.is_empty() {
            return Err(LedgerError::AccountHasHistory {
                account: self.account_id(),
                transactions: self.transactions.len(),
            });
        }
        self.detached = true;
        Ok(std::mem::take(&mut self.prns).into_values().collect())
    }

    /// Record a freshly issued PRN. The caller has already checked the
    /// account is active and the reference code is unused.
    pub(super) fn issue_prn(&mut self, prn: Prn) -> &Prn {
        let prn_id = prn.prn_id();
        self.prns.entry(prn_id).or_insert(prn)
    }

    pub(super) fn expire_prn(&mut self, prn_id: PrnId) -> Result<&Prn, LedgerError> {
        let prn = self
            .prns
            .get_mut(&prn_id)
            .ok_or(LedgerError::PrnNotFound { prn: prn_id })?;
        prn.expire()?;
        Ok(&*prn)
    }

    pub(super) fn cancel_prn(&mut self, prn_id: PrnId) -> Result<&Prn, LedgerError> {
        let prn = self
            .prns
            .get_mut(&prn_id)
            .ok_or(LedgerError::PrnNotFound { prn: prn_id })?;
        prn.cancel()?;
        Ok(&*prn)
    }

    /// Validate and stage a new pending transaction.
    ///
    /// `amount` must already be validated. PRNs issued against other accounts
    /// are not in this book; the caller maps those to `PrnNotAvailable`.
    pub(super) fn open(
        &mut self,
        transaction_id: TransactionId,
        kind: TransactionKind,
        amount: Decimal,
        prn_id: Option<PrnId>,
        allow_overdraft: bool,
        now: DateTime<Utc>,
    ) -> Result<&Transaction, LedgerError> {
        self.ensure_active()?;
        let account_id = self.account_id();

        if let Some(prn_id) = prn_id {
            let prn = self
                .prns
                .get(&prn_id)
                .ok_or_else(|| LedgerError::PrnNotAvailable {
                    prn: prn_id,
                    reason: "not issued to this account".to_string(),
                })?;
            prn.check_available(account_id)?;
        }

        let balance = self.account.balance();
        let transaction = Transaction::open(
            transaction_id,
            account_id,
            kind,
            amount,
            balance,
            prn_id,
            self.version,
            now,
        )?;

        if kind == TransactionKind::Debit
            && !allow_overdraft
            && transaction.balance_after() < Decimal::ZERO
        {
            return Err(LedgerError::InsufficientFunds {
                account: account_id,
                balance,
                requested: amount,
            });
        }

        Ok(&*self
            .transactions
            .entry(transaction_id)
            .or_insert(transaction))
    }

    /// Apply a pending transaction to the account.
    ///
    /// All checks run before anything is written. A transaction that cannot
    /// commit because the world moved on underneath it is marked failed and
    /// the reason is returned.
    pub(super) fn commit(&mut self, tx: TransactionId) -> Result<&Transaction, LedgerError> {
        let account_id = self.account_id();
        let balance = self.account.balance();
        let active = self.account.is_active();
        let version = self.version;

        let transaction = self
            .transactions
            .get_mut(&tx)
            .ok_or(LedgerError::TransactionNotFound { tx })?;
        transaction.ensure_pending()?;

        let rejection = if !active {
            Some(LedgerError::AccountClosed {
                account: account_id,
            })
        } else if transaction.balance_before() != balance || transaction.base_version() != version
        {
            Some(LedgerError::StaleBalance {
                tx,
                expected: transaction.balance_before(),
                actual: balance,
            })
        } else {
            transaction
                .prn_id()
                .and_then(|prn_id| match self.prns.get(&prn_id) {
                    Some(prn) => prn.check_available(account_id).err(),
                    None => Some(LedgerError::PrnNotFound { prn: prn_id }),
                })
        };

        if let Some(err) = rejection {
            transaction.fail(err.to_string());
            log::debug!("[commit] tx={tx} failed: {err}");
            return Err(err);
        }

        self.account.settle(transaction.balance_after());
        transaction.complete();
        if let Some(prn_id) = transaction.prn_id() {
            if let Some(prn) = self.prns.get_mut(&prn_id) {
                prn.mark_paid();
            }
        }
        self.version += 1;

        debug_assert_eq!(
            self.replay(),
            self.account.balance(),
            "Invariant violated: replayed balance diverged from stored balance on account {account_id}"
        );

        Ok(&self.transactions[&tx])
    }

    /// Mark a pending transaction failed. Failing an already failed
    /// transaction is a no-op.
    pub(super) fn fail(
        &mut self,
        tx: TransactionId,
        reason: &str,
    ) -> Result<&Transaction, LedgerError> {
        let transaction = self
            .transactions
            .get_mut(&tx)
            .ok_or(LedgerError::TransactionNotFound { tx })?;

        if transaction.status() != TransactionStatus::Failed {
            transaction.ensure_pending()?;
            transaction.fail(reason);
        }
        Ok(&*transaction)
    }

    /// Fold completed transactions in ascending id order.
    pub(super) fn replay(&self) -> Decimal {
        self.transactions
            .values()
            .filter(|tx| tx.is_completed())
            .fold(Decimal::ZERO, |balance, tx| balance + tx.delta())
            .normalize()
    }

    /// Check the completed transactions form an unbroken chain ending at the
    /// stored balance.
    pub(super) fn verify(&self) -> Result<(), LedgerError> {
        let account_id = self.account_id();
        let mut running = Decimal::ZERO;

        for tx in self.transactions.values().filter(|tx| tx.is_completed()) {
            if tx.balance_before() != running
                || tx.balance_after() != tx.balance_before() + tx.delta()
            {
                return Err(LedgerError::BrokenChain {
                    account: account_id,
                    tx: tx.transaction_id(),
                });
            }
            running = tx.balance_after();
        }

        if running != self.account.balance() {
            return Err(LedgerError::BalanceMismatch {
                account: account_id,
                stored: self.account.balance(),
                replayed: running,
            });
        }
        Ok(())
    }

    /// Fail every pending transaction opened before `cutoff`.
    pub(super) fn reap(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut reaped = 0;
        for tx in self
            .transactions
            .values_mut()
            .filter(|tx| tx.is_pending() && tx.created_at() < cutoff)
        {
            tx.fail(EXPIRED_PENDING);
            reaped += 1;
        }
        reaped
    }
}
