use crate::engine::{
    command::{CommandRecord, CommandType, Label},
    error::CommandError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementAction {
    Commit,
    Fail,
}

impl std::fmt::Display for SettlementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementAction::Commit => write!(f, "commit"),
            SettlementAction::Fail => write!(f, "fail"),
        }
    }
}

/// A validated commit or fail of a previously opened transaction.
///
/// References the transaction by its batch label and carries nothing else.
#[derive(Debug, Clone)]
pub struct Settlement {
    label: Label,
    action: SettlementAction,
}

impl Settlement {
    pub fn label(&self) -> Label {
        self.label
    }

    pub fn action(&self) -> SettlementAction {
        self.action
    }
}

impl TryFrom<CommandRecord> for Settlement {
    type Error = CommandError;

    fn try_from(record: CommandRecord) -> Result<Self, Self::Error> {
        let action = match record.command {
            CommandType::Commit => SettlementAction::Commit,
            CommandType::Fail => SettlementAction::Fail,
            _ => return Err(CommandError::InvalidCommand(record)),
        };
        match record {
            CommandRecord {
                account: None,
                tx: Some(label),
                amount: None,
                prn: None,
                ..
            } => Ok(Settlement { label, action }),
            _ => Err(CommandError::InvalidCommand(record)),
        }
    }
}
