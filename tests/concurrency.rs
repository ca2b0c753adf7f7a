//! Multi-threaded tests: commits on one account never lose an update.
use balance_ledger::{Decimal, Ledger, LedgerError, PrnStatus, TransactionKind, TransactionStatus};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const PER_THREAD: usize = 50;

/// Open and commit until the commit lands, reissuing on stale balance.
fn post(ledger: &Ledger, account: u32, kind: TransactionKind, amount: Decimal) -> u32 {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let tx = ledger.open_transaction(account, kind, amount, None).unwrap();
        match ledger.commit_transaction(tx.transaction_id()) {
            Ok(_) => return attempts,
            Err(e) if e.is_retryable() => continue,
            Err(e) => panic!("unexpected commit error: {e}"),
        }
    }
}

#[test]
fn test_concurrent_commits_on_one_account_lose_nothing() {
    let ledger = Arc::new(Ledger::new());
    ledger.register_account(1).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    post(&ledger, 1, TransactionKind::Credit, dec!(1.25));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected = dec!(1.25) * Decimal::from(THREADS * PER_THREAD);
    assert_eq!(ledger.account(1).unwrap().balance(), expected);
    assert_eq!(ledger.replay_balance(1).unwrap(), expected);
    assert!(ledger.verify_account(1).is_ok());

    // completed transactions chain in id order
    let completed: Vec<_> = ledger
        .transactions_for(1)
        .unwrap()
        .into_iter()
        .filter(|tx| tx.status() == TransactionStatus::Completed)
        .collect();
    assert_eq!(completed.len(), THREADS * PER_THREAD);
    for pair in completed.windows(2) {
        assert_eq!(pair[0].balance_after(), pair[1].balance_before());
    }
}

#[test]
fn test_concurrent_debits_never_overdraw() {
    let ledger = Arc::new(Ledger::new());
    ledger.register_account(1).unwrap();
    post(&ledger, 1, TransactionKind::Credit, dec!(100));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                let mut landed = 0;
                for _ in 0..PER_THREAD {
                    let Ok(tx) = ledger.open_transaction(1, TransactionKind::Debit, dec!(1), None)
                    else {
                        continue;
                    };
                    match ledger.commit_transaction(tx.transaction_id()) {
                        Ok(_) => landed += 1,
                        Err(LedgerError::StaleBalance { .. }) => {}
                        Err(e) => panic!("unexpected commit error: {e}"),
                    }
                }
                landed
            })
        })
        .collect();
    let landed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    let balance = ledger.account(1).unwrap().balance();
    assert!(balance >= Decimal::ZERO);
    assert_eq!(balance, dec!(100) - Decimal::from(landed));
    assert_eq!(ledger.replay_balance(1).unwrap(), balance);
    assert!(ledger.audit().is_empty());
}

#[test]
fn test_accounts_progress_independently() {
    let ledger = Arc::new(Ledger::new());
    for account in 0..THREADS {
        ledger.register_account(u32::try_from(account).unwrap()).unwrap();
    }

    let handles: Vec<_> = (0..THREADS)
        .map(|account| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                let account = u32::try_from(account).unwrap();
                let attempts: u32 = (0..PER_THREAD)
                    .map(|_| post(&ledger, account, TransactionKind::Credit, dec!(2)))
                    .sum();
                // sole writer of its account, so nothing is ever stale
                assert_eq!(attempts, u32::try_from(PER_THREAD).unwrap());
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for account in ledger.accounts() {
        assert_eq!(account.balance(), dec!(2) * Decimal::from(PER_THREAD));
    }
    assert!(ledger.audit().is_empty());
}

#[test]
fn test_prn_paid_by_exactly_one_commit() {
    let ledger = Arc::new(Ledger::new());
    ledger.register_account(1).unwrap();
    let prn = ledger.issue_prn(1, "PRN-RACE").unwrap();

    // every thread stages a payment against the same PRN before any commits
    let staged: Vec<_> = (0..THREADS)
        .map(|_| {
            ledger
                .open_transaction(1, TransactionKind::Credit, dec!(10), Some(prn.prn_id()))
                .unwrap()
                .transaction_id()
        })
        .collect();

    let handles: Vec<_> = staged
        .into_iter()
        .map(|tx| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.commit_transaction(tx).is_ok())
        })
        .collect();
    let committed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(committed, 1);
    assert_eq!(ledger.prn(prn.prn_id()).unwrap().status(), PrnStatus::Paid);
    assert_eq!(ledger.account(1).unwrap().balance(), dec!(10));
    let completed = ledger
        .transactions_for(1)
        .unwrap()
        .iter()
        .filter(|tx| tx.is_completed() && tx.prn_id() == Some(prn.prn_id()))
        .count();
    assert_eq!(completed, 1);
}
