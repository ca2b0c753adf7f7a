use super::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub type AccountId = u32;

/// Serialize Decimal with exactly 2 decimal places
pub(super) fn serialize_decimal_2dp<S: Serializer>(
    value: &Decimal,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:.2}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Closed,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Closed => write!(f, "closed"),
        }
    }
}

/// An account and its current balance.
///
/// The balance is only ever written by the ledger's commit path; every change
/// corresponds to exactly one completed transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    #[serde(rename = "account")]
    account_id: AccountId,
    #[serde(serialize_with = "serialize_decimal_2dp")]
    balance: Decimal,
    status: AccountStatus,
}

impl Account {
    pub(super) fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            balance: Decimal::ZERO,
            status: AccountStatus::Active,
        }
    }

    /// Returns the account ID
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Returns the current balance
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Move the balance to the `balance_after` of a transaction being
    /// committed.
    ///
    /// # Panics (debug only)
    /// Panics if called on a closed account.
    pub(super) fn settle(&mut self, balance_after: Decimal) {
        debug_assert!(self.is_active(), "settle called on closed account");
        self.balance = balance_after.normalize();
    }

    pub(super) fn close(&mut self) {
        self.status = AccountStatus::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_account_is_active_with_zero_balance() {
        let account = Account::new(1);
        assert_eq!(account.account_id(), 1);
        assert_eq!(account.balance(), Decimal::ZERO);
        assert!(account.is_active());
    }

    #[test]
    fn test_settle_normalizes_balance() {
        let mut account = Account::new(1);
        account.settle(dec!(70.00));

        assert_eq!(account.balance(), dec!(70));
        assert_eq!(account.balance().to_string(), "70");
    }

    #[test]
    fn test_close_marks_account_closed() {
        let mut account = Account::new(1);
        account.close();
        assert_eq!(account.status(), AccountStatus::Closed);
        assert!(!account.is_active());
    }

    #[test]
    fn test_serializes_balance_with_two_decimals() {
        let mut account = Account::new(4);
        account.settle(dec!(12.5));

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.serialize(&account).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();

        assert_eq!(out, "account,balance,status\n4,12.50,active\n");
    }
}
