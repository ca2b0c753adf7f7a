use crate::engine::{
    account::AccountId,
    command::{CommandRecord, CommandType},
    error::CommandError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrnAction {
    /// Issue against the owning account
    Issue(AccountId),
    Expire,
    Cancel,
}

impl std::fmt::Display for PrnAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrnAction::Issue(_) => write!(f, "issue"),
            PrnAction::Expire => write!(f, "expire"),
            PrnAction::Cancel => write!(f, "cancel"),
        }
    }
}

/// A validated PRN lifecycle command.
///
/// Issuing needs the owning account and the reference code. Expiring and
/// cancelling address the PRN by reference code alone.
#[derive(Debug, Clone)]
pub struct PrnCommand {
    prn_number: String,
    action: PrnAction,
}

impl PrnCommand {
    pub fn prn_number(&self) -> &str {
        &self.prn_number
    }

    pub fn action(&self) -> PrnAction {
        self.action
    }
}

impl TryFrom<CommandRecord> for PrnCommand {
    type Error = CommandError;

    fn try_from(record: CommandRecord) -> Result<Self, Self::Error> {
        match record {
            CommandRecord {
                command: CommandType::Issue,
                account: Some(account),
                tx: None,
                amount: None,
                prn: Some(ref number),
            } if !number.is_empty() => Ok(PrnCommand {
                prn_number: number.clone(),
                action: PrnAction::Issue(account),
            }),
            CommandRecord {
                command: command @ (CommandType::Expire | CommandType::Cancel),
                account: None,
                tx: None,
                amount: None,
                prn: Some(ref number),
            } if !number.is_empty() => Ok(PrnCommand {
                prn_number: number.clone(),
                action: if command == CommandType::Expire {
                    PrnAction::Expire
                } else {
                    PrnAction::Cancel
                },
            }),
            _ => Err(CommandError::InvalidCommand(record)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(
        command: CommandType,
        account: Option<AccountId>,
        prn: Option<&str>,
    ) -> CommandRecord {
        CommandRecord {
            command,
            account,
            tx: None,
            amount: None,
            prn: prn.map(str::to_string),
        }
    }

    #[test]
    fn test_valid_issue() {
        let command =
            PrnCommand::try_from(make_record(CommandType::Issue, Some(1), Some("PRN-1"))).unwrap();
        assert_eq!(command.prn_number(), "PRN-1");
        assert_eq!(command.action(), PrnAction::Issue(1));
    }

    #[test]
    fn test_valid_expire_and_cancel() {
        let expire =
            PrnCommand::try_from(make_record(CommandType::Expire, None, Some("PRN-1"))).unwrap();
        assert_eq!(expire.action(), PrnAction::Expire);

        let cancel =
            PrnCommand::try_from(make_record(CommandType::Cancel, None, Some("PRN-1"))).unwrap();
        assert_eq!(cancel.action(), PrnAction::Cancel);
    }

    #[test]
    fn test_issue_requires_account() {
        assert!(PrnCommand::try_from(make_record(CommandType::Issue, None, Some("PRN-1"))).is_err());
    }

    #[test]
    fn test_rejects_missing_reference() {
        assert!(PrnCommand::try_from(make_record(CommandType::Expire, None, None)).is_err());
        assert!(PrnCommand::try_from(make_record(CommandType::Issue, Some(1), Some(""))).is_err());
    }

    #[test]
    fn test_rejects_with_transaction_label() {
        let mut record = make_record(CommandType::Cancel, None, Some("PRN-1"));
        record.tx = Some(4);
        assert!(PrnCommand::try_from(record).is_err());
    }
}
