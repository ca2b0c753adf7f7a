mod account;
mod posting;
mod reference;
mod settlement;

pub use account::{AccountAction, AccountCommand};
pub use posting::Posting;
pub use reference::{PrnAction, PrnCommand};
pub use settlement::{Settlement, SettlementAction};

use super::account::AccountId;
use super::Decimal;
use crate::engine::error::CommandError;
use serde::Deserialize;

/// Caller-chosen label for a transaction inside one batch
pub type Label = u64;

/// Raw command record as parsed from CSV input.
/// This is the unvalidated form that needs conversion to a specific Command type.
#[derive(Debug, Deserialize, Clone)]
pub struct CommandRecord {
    #[serde(rename = "type")]
    pub command: CommandType,
    #[serde(default)]
    pub account: Option<AccountId>,
    /// Batch label of the transaction to open, commit or fail
    #[serde(default)]
    pub tx: Option<Label>,
    /// Required for postings; signed for adjustments
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// PRN reference code
    #[serde(default)]
    pub prn: Option<String>,
}

impl std::fmt::Display for CommandRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command)?;
        if let Some(account) = self.account {
            write!(f, " account={account}")?;
        }
        if let Some(tx) = self.tx {
            write!(f, " tx={tx}")?;
        }
        if let Some(amount) = self.amount {
            write!(f, " amount={amount}")?;
        }
        if let Some(prn) = &self.prn {
            write!(f, " prn={prn}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Register,
    Close,
    Remove,
    Issue,
    Expire,
    Cancel,
    Credit,
    Debit,
    Refund,
    Adjust,
    Commit,
    Fail,
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommandType::Register => "register",
            CommandType::Close => "close",
            CommandType::Remove => "remove",
            CommandType::Issue => "issue",
            CommandType::Expire => "expire",
            CommandType::Cancel => "cancel",
            CommandType::Credit => "credit",
            CommandType::Debit => "debit",
            CommandType::Refund => "refund",
            CommandType::Adjust => "adjust",
            CommandType::Commit => "commit",
            CommandType::Fail => "fail",
        };
        write!(f, "{name}")
    }
}

/// A validated command ready to be applied to the ledger.
#[derive(Debug, Clone)]
pub enum Command {
    Account(AccountCommand),
    Prn(PrnCommand),
    Open(Posting),
    Settle(Settlement),
}

impl TryFrom<CommandRecord> for Command {
    type Error = CommandError;

    fn try_from(record: CommandRecord) -> Result<Self, Self::Error> {
        match record.command {
            CommandType::Register | CommandType::Close | CommandType::Remove => {
                Ok(Command::Account(AccountCommand::try_from(record)?))
            }
            CommandType::Issue | CommandType::Expire | CommandType::Cancel => {
                Ok(Command::Prn(PrnCommand::try_from(record)?))
            }
            CommandType::Credit | CommandType::Debit | CommandType::Refund | CommandType::Adjust => {
                Ok(Command::Open(Posting::try_from(record)?))
            }
            CommandType::Commit | CommandType::Fail => {
                Ok(Command::Settle(Settlement::try_from(record)?))
            }
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Account(c) => write!(f, "[{}] account={}", c.action(), c.account_id()),
            Command::Prn(c) => match c.action() {
                PrnAction::Issue(account) => {
                    write!(f, "[{}] account={} prn={}", c.action(), account, c.prn_number())
                }
                PrnAction::Expire | PrnAction::Cancel => {
                    write!(f, "[{}] prn={}", c.action(), c.prn_number())
                }
            },
            Command::Open(p) => write!(
                f,
                "[{}] account={} tx={} amount={}",
                p.kind(),
                p.account_id(),
                p.label(),
                p.amount()
            ),
            Command::Settle(s) => write!(f, "[{}] tx={}", s.action(), s.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(command: CommandType) -> CommandRecord {
        CommandRecord {
            command,
            account: None,
            tx: None,
            amount: None,
            prn: None,
        }
    }

    #[test]
    fn test_dispatches_by_type() {
        let mut posting = record(CommandType::Debit);
        posting.account = Some(1);
        posting.tx = Some(7);
        posting.amount = Some(dec!(30));
        assert!(matches!(Command::try_from(posting), Ok(Command::Open(_))));

        let mut settle = record(CommandType::Commit);
        settle.tx = Some(7);
        assert!(matches!(Command::try_from(settle), Ok(Command::Settle(_))));

        let mut register = record(CommandType::Register);
        register.account = Some(1);
        assert!(matches!(Command::try_from(register), Ok(Command::Account(_))));

        let mut expire = record(CommandType::Expire);
        expire.prn = Some("P-1".to_string());
        assert!(matches!(Command::try_from(expire), Ok(Command::Prn(_))));
    }

    #[test]
    fn test_record_display() {
        let mut rec = record(CommandType::Credit);
        rec.account = Some(2);
        rec.tx = Some(5);
        rec.amount = Some(dec!(1.5));
        assert_eq!(rec.to_string(), "credit account=2 tx=5 amount=1.5");
    }

    #[test]
    fn test_parses_csv_with_empty_fields() {
        let input = "type,account,tx,amount,prn\nissue,1,,,PRN-1\ncommit,,4,,\n";
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(input.as_bytes());
        let records: Vec<CommandRecord> = rdr.deserialize().map(|r| r.unwrap()).collect();

        assert_eq!(records[0].command, CommandType::Issue);
        assert_eq!(records[0].account, Some(1));
        assert_eq!(records[0].tx, None);
        assert_eq!(records[0].prn.as_deref(), Some("PRN-1"));
        assert_eq!(records[1].command, CommandType::Commit);
        assert_eq!(records[1].tx, Some(4));
        assert_eq!(records[1].prn, None);
    }
}
