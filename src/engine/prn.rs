use super::account::AccountId;
use super::error::{LedgerError, Subject};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PrnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrnStatus {
    Pending,
    Paid,
    Expired,
    Cancelled,
}

impl PrnStatus {
    pub fn is_terminal(self) -> bool {
        self != PrnStatus::Pending
    }
}

impl fmt::Display for PrnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrnStatus::Pending => write!(f, "pending"),
            PrnStatus::Paid => write!(f, "paid"),
            PrnStatus::Expired => write!(f, "expired"),
            PrnStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A payment reference issued against an account.
///
/// `Paid` is reachable only through the ledger's commit path, see
/// [`Prn::mark_paid`]. Every other transition out of `Pending` is final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prn {
    #[serde(rename = "prn")]
    prn_id: PrnId,
    #[serde(rename = "number")]
    prn_number: String,
    #[serde(rename = "account")]
    account_id: AccountId,
    status: PrnStatus,
}

impl Prn {
    pub(super) fn new(prn_id: PrnId, prn_number: String, account_id: AccountId) -> Self {
        Self {
            prn_id,
            prn_number,
            account_id,
            status: PrnStatus::Pending,
        }
    }

    pub fn prn_id(&self) -> PrnId {
        self.prn_id
    }

    /// Returns the caller-facing reference code
    pub fn prn_number(&self) -> &str {
        &self.prn_number
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn status(&self) -> PrnStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == PrnStatus::Pending
    }

    /// Check that a transaction on `account_id` may reference this PRN.
    pub(super) fn check_available(&self, account_id: AccountId) -> Result<(), LedgerError> {
        if self.account_id != account_id {
            return Err(LedgerError::PrnNotAvailable {
                prn: self.prn_id,
                reason: format!("belongs to account {}", self.account_id),
            });
        }
        if !self.is_pending() {
            return Err(LedgerError::PrnNotAvailable {
                prn: self.prn_id,
                reason: format!("status is {}", self.status),
            });
        }
        Ok(())
    }

    /// # Panics (debug only)
    /// Panics if the PRN is not pending.
    pub(super) fn mark_paid(&mut self) {
        debug_assert!(self.is_pending(), "mark_paid called on {} PRN", self.status);
        self.status = PrnStatus::Paid;
    }

    pub(super) fn expire(&mut self) -> Result<(), LedgerError> {
        self.retire(PrnStatus::Expired)
    }

    pub(super) fn cancel(&mut self) -> Result<(), LedgerError> {
        self.retire(PrnStatus::Cancelled)
    }

    fn retire(&mut self, status: PrnStatus) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::AlreadyTerminal(Subject::Prn(
                self.prn_id,
                self.status,
            )));
        }
        self.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Prn {
        Prn::new(1, "PRN-0001".to_string(), 10)
    }

    #[test]
    fn test_new_prn_is_pending() {
        let prn = pending();
        assert_eq!(prn.status(), PrnStatus::Pending);
        assert_eq!(prn.prn_number(), "PRN-0001");
        assert!(prn.check_available(10).is_ok());
    }

    #[test]
    fn test_unavailable_to_other_account() {
        let prn = pending();
        let err = prn.check_available(11).unwrap_err();
        assert!(matches!(err, LedgerError::PrnNotAvailable { prn: 1, .. }));
    }

    #[test]
    fn test_expire_is_terminal() {
        let mut prn = pending();
        prn.expire().unwrap();
        assert_eq!(prn.status(), PrnStatus::Expired);

        assert_eq!(
            prn.cancel(),
            Err(LedgerError::AlreadyTerminal(Subject::Prn(1, PrnStatus::Expired)))
        );
        assert!(prn.check_available(10).is_err());
    }

    #[test]
    fn test_paid_prn_cannot_be_cancelled() {
        let mut prn = pending();
        prn.mark_paid();

        assert_eq!(
            prn.cancel(),
            Err(LedgerError::AlreadyTerminal(Subject::Prn(1, PrnStatus::Paid)))
        );
        assert_eq!(prn.status(), PrnStatus::Paid);
    }
}
