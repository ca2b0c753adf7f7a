use crate::engine::{
    account::AccountId,
    command::{CommandRecord, CommandType},
    error::CommandError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAction {
    Register,
    Close,
    Remove,
}

impl std::fmt::Display for AccountAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountAction::Register => write!(f, "register"),
            AccountAction::Close => write!(f, "close"),
            AccountAction::Remove => write!(f, "remove"),
        }
    }
}

/// A validated account maintenance command.
///
/// Takes only an account ID; any other populated column is rejected.
#[derive(Debug, Clone)]
pub struct AccountCommand {
    account_id: AccountId,
    action: AccountAction,
}

impl AccountCommand {
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn action(&self) -> AccountAction {
        self.action
    }
}

impl TryFrom<CommandRecord> for AccountCommand {
    type Error = CommandError;

    fn try_from(record: CommandRecord) -> Result<Self, Self::Error> {
        let action = match record.command {
            CommandType::Register => AccountAction::Register,
            CommandType::Close => AccountAction::Close,
            CommandType::Remove => AccountAction::Remove,
            _ => return Err(CommandError::InvalidCommand(record)),
        };
        match record {
            CommandRecord {
                account: Some(account),
                tx: None,
                amount: None,
                prn: None,
                ..
            } => Ok(AccountCommand {
                account_id: account,
                action,
            }),
            _ => Err(CommandError::InvalidCommand(record)),
        }
    }
}
