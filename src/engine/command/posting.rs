use crate::engine::{
    account::AccountId,
    command::{CommandRecord, CommandType, Label},
    error::CommandError,
    transaction::{Direction, TransactionKind},
    Decimal,
};

/// A validated request to open a transaction.
///
/// Amount rules (positive, two decimals) belong to the ledger and are not
/// checked here. For `adjust` the sign of the amount selects the direction
/// and the posting carries its magnitude.
#[derive(Debug, Clone)]
pub struct Posting {
    account_id: AccountId,
    label: Label,
    kind: TransactionKind,
    amount: Decimal,
    prn_number: Option<String>,
}

impl Posting {
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn prn_number(&self) -> Option<&str> {
        self.prn_number.as_deref()
    }
}

impl TryFrom<CommandRecord> for Posting {
    type Error = CommandError;

    fn try_from(record: CommandRecord) -> Result<Self, Self::Error> {
        let CommandRecord {
            account: Some(account),
            tx: Some(label),
            amount: Some(amount),
            ..
        } = record
        else {
            return Err(CommandError::InvalidCommand(record));
        };

        let (kind, amount) = match record.command {
            CommandType::Credit => (TransactionKind::Credit, amount),
            CommandType::Debit => (TransactionKind::Debit, amount),
            CommandType::Refund => (TransactionKind::Refund, amount),
            CommandType::Adjust if amount < Decimal::ZERO => {
                (TransactionKind::Adjustment(Direction::Decrease), -amount)
            }
            CommandType::Adjust => (TransactionKind::Adjustment(Direction::Increase), amount),
            _ => return Err(CommandError::InvalidCommand(record)),
        };

        Ok(Posting {
            account_id: account,
            label,
            kind,
            amount,
            prn_number: record.prn.filter(|number| !number.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_record(command: CommandType, amount: Option<Decimal>) -> CommandRecord {
        CommandRecord {
            command,
            account: Some(1),
            tx: Some(10),
            amount,
            prn: None,
        }
    }

    #[test]
    fn test_valid_debit() {
        let posting = Posting::try_from(make_record(CommandType::Debit, Some(dec!(30.00)))).unwrap();

        assert_eq!(posting.account_id(), 1);
        assert_eq!(posting.label(), 10);
        assert_eq!(posting.kind(), TransactionKind::Debit);
        assert_eq!(posting.amount(), dec!(30.00));
        assert_eq!(posting.prn_number(), None);
    }

    #[test]
    fn test_keeps_prn_reference() {
        let mut record = make_record(CommandType::Credit, Some(dec!(5)));
        record.prn = Some("PRN-7".to_string());
        let posting = Posting::try_from(record).unwrap();
        assert_eq!(posting.prn_number(), Some("PRN-7"));
    }

    #[test]
    fn test_negative_adjust_is_decrease() {
        let posting = Posting::try_from(make_record(CommandType::Adjust, Some(dec!(-2.50)))).unwrap();
        assert_eq!(posting.kind(), TransactionKind::Adjustment(Direction::Decrease));
        assert_eq!(posting.amount(), dec!(2.50));
    }

    #[test]
    fn test_positive_adjust_is_increase() {
        let posting = Posting::try_from(make_record(CommandType::Adjust, Some(dec!(4)))).unwrap();
        assert_eq!(posting.kind(), TransactionKind::Adjustment(Direction::Increase));
        assert_eq!(posting.amount(), dec!(4));
    }

    #[test]
    fn test_negative_credit_is_left_to_the_ledger() {
        let posting = Posting::try_from(make_record(CommandType::Credit, Some(dec!(-4)))).unwrap();
        assert_eq!(posting.amount(), dec!(-4));
    }

    #[test]
    fn test_rejects_missing_amount() {
        assert!(Posting::try_from(make_record(CommandType::Credit, None)).is_err());
    }

    #[test]
    fn test_rejects_missing_label() {
        let mut record = make_record(CommandType::Credit, Some(dec!(1)));
        record.tx = None;
        assert!(Posting::try_from(record).is_err());
    }

    #[test]
    fn test_rejects_wrong_command_type() {
        assert!(Posting::try_from(make_record(CommandType::Commit, Some(dec!(1)))).is_err());
    }
}
