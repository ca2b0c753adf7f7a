use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::account::{Account, AccountId};
use super::book::AccountBook;
use super::error::LedgerError;
use super::prn::{Prn, PrnId};
use super::transaction::{validate_amount, Transaction, TransactionId, TransactionKind};
use super::Decimal;

/// Engine settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Let debits take an account below zero.
    pub allow_overdraft: bool,
}

type SharedBook = Arc<Mutex<AccountBook>>;

/// The ledger engine.
///
/// Owns every account balance and the append-only transaction log. Each
/// account lives in its own mutex-guarded book, so commits on one account
/// are serialized while commits on different accounts run in parallel.
///
/// Locks are taken in a fixed order: the account registry, then a book, then
/// `prn_numbers`, then the ID indexes. Nothing waits on the registry while
/// holding a book.
#[derive(Debug)]
pub struct Ledger {
    config: LedgerConfig,
    /// Maps account ID to its book
    books: RwLock<HashMap<AccountId, SharedBook>>,
    /// Maps transaction ID to the account that owns it
    transactions: RwLock<HashMap<TransactionId, AccountId>>,
    /// Maps PRN ID to the account it was issued against
    prns: RwLock<HashMap<PrnId, AccountId>>,
    /// Maps PRN reference code to PRN ID
    prn_numbers: RwLock<HashMap<String, PrnId>>,
    next_transaction_id: AtomicU64,
    next_prn_id: AtomicU64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Books are validated before they are written, so a panic elsewhere
    // cannot leave one half-updated.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Ledger {
    /// Create a new `Ledger` with no accounts and default settings
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        log::trace!("Ledger initialized with {config:?}");
        Self {
            config,
            books: RwLock::new(HashMap::new()),
            transactions: RwLock::new(HashMap::new()),
            prns: RwLock::new(HashMap::new()),
            prn_numbers: RwLock::new(HashMap::new()),
            next_transaction_id: AtomicU64::new(1),
            next_prn_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    /// Returns the number of accounts in the ledger
    pub fn account_count(&self) -> usize {
        read(&self.books).len()
    }

    fn book(&self, account: AccountId) -> Result<SharedBook, LedgerError> {
        read(&self.books)
            .get(&account)
            .cloned()
            .ok_or(LedgerError::AccountNotFound { account })
    }

    /// Lock an account's book, treating a book removed after lookup as absent.
    fn with_book<T>(
        &self,
        account: AccountId,
        f: impl FnOnce(&mut AccountBook) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let book = self.book(account)?;
        let mut book = lock(&book);
        if book.is_detached() {
            return Err(LedgerError::AccountNotFound { account });
        }
        f(&mut book)
    }

    fn owner_of_transaction(&self, tx: TransactionId) -> Result<AccountId, LedgerError> {
        read(&self.transactions)
            .get(&tx)
            .copied()
            .ok_or(LedgerError::TransactionNotFound { tx })
    }

    fn owner_of_prn(&self, prn: PrnId) -> Result<AccountId, LedgerError> {
        read(&self.prns)
            .get(&prn)
            .copied()
            .ok_or(LedgerError::PrnNotFound { prn })
    }

    fn all_books(&self) -> Vec<SharedBook> {
        let mut books: Vec<(AccountId, SharedBook)> = read(&self.books)
            .iter()
            .map(|(id, book)| (*id, Arc::clone(book)))
            .collect();
        books.sort_by_key(|(id, _)| *id);
        books.into_iter().map(|(_, book)| book).collect()
    }
}

// =============================================================================
// Accounts
// =============================================================================

impl Ledger {
    /// Register an active account with a zero balance.
    pub fn register_account(&self, account: AccountId) -> Result<Account, LedgerError> {
        let mut books = write(&self.books);
        if books.contains_key(&account) {
            return Err(LedgerError::AccountAlreadyExists { account });
        }
        let book = AccountBook::new(account);
        let snapshot = book.account().clone();
        books.insert(account, Arc::new(Mutex::new(book)));

        log::debug!("[register] account={account}");
        Ok(snapshot)
    }

    /// Close an account. Pending transactions on it will fail at commit.
    pub fn close_account(&self, account: AccountId) -> Result<Account, LedgerError> {
        self.with_book(account, |book| {
            book.close()?;
            log::debug!("[close] account={account}");
            Ok(book.account().clone())
        })
    }

    /// Remove an account that never transacted, along with its PRNs.
    ///
    /// The transaction log is never truncated, so any transaction on record
    /// (whatever its status) blocks removal with `AccountHasHistory`.
    pub fn remove_account(&self, account: AccountId) -> Result<Account, LedgerError> {
        let mut books = write(&self.books);
        let book = books
            .get(&account)
            .cloned()
            .ok_or(LedgerError::AccountNotFound { account })?;
        let mut book = lock(&book);

        let cascaded = book.detach()?;
        books.remove(&account);

        let mut numbers = write(&self.prn_numbers);
        let mut prns = write(&self.prns);
        for prn in &cascaded {
            prns.remove(&prn.prn_id());
            numbers.remove(prn.prn_number());
        }

        log::debug!(
            "[remove] account={account} cascaded {} PRN(s)",
            cascaded.len()
        );
        Ok(book.account().clone())
    }

    pub fn account(&self, account: AccountId) -> Result<Account, LedgerError> {
        self.with_book(account, |book| Ok(book.account().clone()))
    }

    /// Snapshot of every account, sorted by account ID
    pub fn accounts(&self) -> Vec<Account> {
        self.all_books()
            .iter()
            .map(|book| lock(book))
            .filter(|book| !book.is_detached())
            .map(|book| book.account().clone())
            .collect()
    }
}

// =============================================================================
// Payment references
// =============================================================================

impl Ledger {
    /// Issue a pending PRN against an active account.
    pub fn issue_prn(
        &self,
        account: AccountId,
        prn_number: impl Into<String>,
    ) -> Result<Prn, LedgerError> {
        let prn_number = prn_number.into();
        self.with_book(account, |book| {
            book.ensure_active()?;

            let mut numbers = write(&self.prn_numbers);
            if numbers.contains_key(&prn_number) {
                return Err(LedgerError::DuplicatePrn { number: prn_number });
            }
            let prn_id = self.next_prn_id.fetch_add(1, Ordering::SeqCst);
            let prn = book
                .issue_prn(Prn::new(prn_id, prn_number.clone(), account))
                .clone();
            numbers.insert(prn_number, prn_id);
            write(&self.prns).insert(prn_id, account);

            log::debug!("[issue] account={account} prn={prn_id} number={}", prn.prn_number());
            Ok(prn)
        })
    }

    /// Mark a pending PRN expired. Terminal.
    pub fn expire_prn(&self, prn: PrnId) -> Result<Prn, LedgerError> {
        let account = self.owner_of_prn(prn)?;
        self.with_book(account, |book| {
            let prn = book.expire_prn(prn)?.clone();
            log::debug!("[expire] prn={}", prn.prn_id());
            Ok(prn)
        })
    }

    /// Mark a pending PRN cancelled. Terminal.
    pub fn cancel_prn(&self, prn: PrnId) -> Result<Prn, LedgerError> {
        let account = self.owner_of_prn(prn)?;
        self.with_book(account, |book| {
            let prn = book.cancel_prn(prn)?.clone();
            log::debug!("[cancel] prn={}", prn.prn_id());
            Ok(prn)
        })
    }

    pub fn prn(&self, prn: PrnId) -> Result<Prn, LedgerError> {
        let account = self.owner_of_prn(prn)?;
        self.with_book(account, |book| {
            book.prn(prn).cloned().ok_or(LedgerError::PrnNotFound { prn })
        })
    }

    /// Look up a PRN by its reference code
    pub fn prn_by_number(&self, prn_number: &str) -> Option<Prn> {
        let prn = read(&self.prn_numbers).get(prn_number).copied()?;
        self.prn(prn).ok()
    }

    /// PRNs issued against an account, in ascending ID order
    pub fn prns_for(&self, account: AccountId) -> Result<Vec<Prn>, LedgerError> {
        self.with_book(account, |book| Ok(book.prns().cloned().collect()))
    }
}

// =============================================================================
// Transactions
// =============================================================================

impl Ledger {
    /// Stage a pending transaction against an account.
    ///
    /// The returned snapshot carries `balance_before` as of now and the
    /// `balance_after` the commit will write.
    pub fn open_transaction(
        &self,
        account: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        prn: Option<PrnId>,
    ) -> Result<Transaction, LedgerError> {
        log::trace!("[open] account={account} kind={kind} amount={amount} prn={prn:?}");
        let amount = validate_amount(amount)?;

        self.with_book(account, |book| {
            if let Some(prn) = prn {
                // PRNs of other accounts are not in this book; name the owner.
                if book.prn(prn).is_none() {
                    let reason = match read(&self.prns).get(&prn) {
                        Some(owner) => format!("belongs to account {owner}"),
                        None => "unknown PRN".to_string(),
                    };
                    return Err(LedgerError::PrnNotAvailable { prn, reason });
                }
            }

            let tx = self.next_transaction_id.fetch_add(1, Ordering::SeqCst);
            let transaction = book
                .open(
                    tx,
                    kind,
                    amount,
                    prn,
                    self.config.allow_overdraft,
                    Utc::now(),
                )?
                .clone();
            write(&self.transactions).insert(tx, account);

            log::debug!("[open] {transaction}");
            Ok(transaction)
        })
    }

    /// Apply a pending transaction: write the new balance, complete the
    /// transaction and mark its PRN paid, all in one critical section.
    ///
    /// Fails with `StaleBalance` (and marks the transaction failed) if
    /// another commit landed on the account since the transaction was opened.
    pub fn commit_transaction(&self, tx: TransactionId) -> Result<Transaction, LedgerError> {
        let account = self.owner_of_transaction(tx)?;
        self.with_book(account, |book| {
            let transaction = book.commit(tx)?.clone();
            log::debug!("[commit] {transaction}");
            Ok(transaction)
        })
    }

    /// Mark a pending transaction failed. Idempotent for failed transactions.
    pub fn fail_transaction(
        &self,
        tx: TransactionId,
        reason: &str,
    ) -> Result<Transaction, LedgerError> {
        let account = self.owner_of_transaction(tx)?;
        self.with_book(account, |book| {
            let transaction = book.fail(tx, reason)?.clone();
            log::debug!("[fail] tx={tx} reason={reason}");
            Ok(transaction)
        })
    }

    pub fn transaction(&self, tx: TransactionId) -> Result<Transaction, LedgerError> {
        let account = self.owner_of_transaction(tx)?;
        self.with_book(account, |book| {
            book.transaction(tx)
                .cloned()
                .ok_or(LedgerError::TransactionNotFound { tx })
        })
    }

    /// The account's transactions in ascending ID order, any status
    pub fn transactions_for(&self, account: AccountId) -> Result<Vec<Transaction>, LedgerError> {
        self.with_book(account, |book| Ok(book.transactions().cloned().collect()))
    }

    /// Every transaction on record, grouped by account then ID
    pub fn all_transactions(&self) -> Vec<Transaction> {
        self.all_books()
            .iter()
            .flat_map(|book| lock(book).transactions().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Fail pending transactions older than `timeout`.
    pub fn reap_pending(&self, timeout: std::time::Duration) -> Result<usize, LedgerError> {
        let cutoff = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|timeout| Utc::now().checked_sub_signed(timeout))
            .ok_or(LedgerError::TimeoutOutOfRange { timeout })?;
        Ok(self.reap_pending_before(cutoff))
    }

    /// Fail pending transactions opened before `cutoff`.
    pub fn reap_pending_before(&self, cutoff: DateTime<Utc>) -> usize {
        let reaped: usize = self
            .all_books()
            .iter()
            .map(|book| lock(book).reap(cutoff))
            .sum();
        if reaped > 0 {
            log::info!("Reaped {reaped} pending transaction(s) opened before {cutoff}");
        }
        reaped
    }
}

// =============================================================================
// Audit
// =============================================================================

impl Ledger {
    /// Recompute an account's balance from its completed transactions.
    pub fn replay_balance(&self, account: AccountId) -> Result<Decimal, LedgerError> {
        self.with_book(account, |book| Ok(book.replay()))
    }

    /// Check the account's completed transactions chain up to its balance.
    pub fn verify_account(&self, account: AccountId) -> Result<(), LedgerError> {
        self.with_book(account, |book| book.verify())
    }

    /// Verify every account, returning the violations found.
    pub fn audit(&self) -> Vec<LedgerError> {
        let violations: Vec<LedgerError> = self
            .all_books()
            .iter()
            .filter_map(|book| lock(book).verify().err())
            .collect();
        for violation in &violations {
            log::warn!("Audit: {violation}");
        }
        violations
    }
}
