use std::collections::HashMap;
use std::io::Read;

use super::command::{
    AccountAction, AccountCommand, Command, CommandRecord, Label, Posting, PrnAction, PrnCommand,
    Settlement, SettlementAction,
};
use super::error::{Error, ProcessingError};
use super::ledger::Ledger;
use super::prn::PrnId;
use super::transaction::TransactionId;

/// Reason recorded on transactions failed by a `fail` command.
pub const BATCH_FAIL_REASON: &str = "failed by batch";

/// Counts reported at the end of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: u64,
    pub skipped: u64,
}

/// Applies CSV command streams to a ledger.
///
/// Transactions are addressed by caller-chosen labels, which the processor
/// maps to the IDs the ledger assigns. Labels stay valid across every stream
/// fed to the same processor.
#[derive(Debug)]
pub struct BatchProcessor<'a> {
    ledger: &'a Ledger,
    labels: HashMap<Label, TransactionId>,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            labels: HashMap::new(),
        }
    }

    /// Ledger transaction ID behind a batch label
    pub fn transaction_id(&self, label: Label) -> Option<TransactionId> {
        self.labels.get(&label).copied()
    }

    /// Process commands from any source (File, `TcpStream`, etc.)
    /// Note that the CSV reader is buffered automatically, so you should not wrap rdr in a buffered reader like `io::BufReader`.
    pub fn process<R: Read>(&mut self, reader: R) -> Result<BatchSummary, Error> {
        log::info!("Starting command processing");

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut summary = BatchSummary::default();

        for result in csv_reader.deserialize() {
            // Step 1: Parse CSV record into raw CommandRecord
            let record: CommandRecord = result?;

            let row_num = summary.applied + summary.skipped + 1;
            log::trace!("[row {row_num}] Parsing: {record}");

            // Step 2: Convert raw CommandRecord into validated Command
            let command = Command::try_from(record)?;

            // Step 3: Apply validated Command
            if let Err(e) = self.apply(command) {
                log::warn!("[row {row_num}] - Skipped: {e}");
                summary.skipped += 1;
            } else {
                summary.applied += 1;
            }
        }

        log::info!(
            "Processing complete: {} applied, {} skipped, {} accounts",
            summary.applied,
            summary.skipped,
            self.ledger.account_count()
        );
        Ok(summary)
    }

    /// Apply one validated command to the ledger.
    pub fn apply(&mut self, command: Command) -> Result<(), ProcessingError> {
        log::trace!("Applying command: {command}");
        match command {
            Command::Account(command) => self.handle_account(command),
            Command::Prn(command) => self.handle_prn(command),
            Command::Open(posting) => self.handle_posting(posting),
            Command::Settle(settlement) => self.handle_settlement(settlement),
        }
    }

    fn resolve_prn(&self, number: &str) -> Result<PrnId, ProcessingError> {
        self.ledger
            .prn_by_number(number)
            .map(|prn| prn.prn_id())
            .ok_or_else(|| ProcessingError::UnknownPrn {
                number: number.to_string(),
            })
    }

    fn resolve_label(&self, label: Label) -> Result<TransactionId, ProcessingError> {
        self.transaction_id(label)
            .ok_or(ProcessingError::UnknownLabel { label })
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

impl BatchProcessor<'_> {
    fn handle_account(&mut self, command: AccountCommand) -> Result<(), ProcessingError> {
        let account = command.account_id();
        match command.action() {
            AccountAction::Register => self.ledger.register_account(account)?,
            AccountAction::Close => self.ledger.close_account(account)?,
            AccountAction::Remove => self.ledger.remove_account(account)?,
        };
        Ok(())
    }

    fn handle_prn(&mut self, command: PrnCommand) -> Result<(), ProcessingError> {
        match command.action() {
            PrnAction::Issue(account) => {
                self.ledger.issue_prn(account, command.prn_number())?;
            }
            PrnAction::Expire => {
                let prn = self.resolve_prn(command.prn_number())?;
                self.ledger.expire_prn(prn)?;
            }
            PrnAction::Cancel => {
                let prn = self.resolve_prn(command.prn_number())?;
                self.ledger.cancel_prn(prn)?;
            }
        }
        Ok(())
    }

    fn handle_posting(&mut self, posting: Posting) -> Result<(), ProcessingError> {
        let label = posting.label();
        if self.labels.contains_key(&label) {
            return Err(ProcessingError::DuplicateLabel { label });
        }

        let prn = posting
            .prn_number()
            .map(|number| self.resolve_prn(number))
            .transpose()?;

        let transaction = self.ledger.open_transaction(
            posting.account_id(),
            posting.kind(),
            posting.amount(),
            prn,
        )?;
        self.labels.insert(label, transaction.transaction_id());

        log::trace!(
            "[open] label={label} -> tx={} before={} after={}",
            transaction.transaction_id(),
            transaction.balance_before(),
            transaction.balance_after()
        );
        Ok(())
    }

    fn handle_settlement(&mut self, settlement: Settlement) -> Result<(), ProcessingError> {
        let tx = self.resolve_label(settlement.label())?;
        match settlement.action() {
            SettlementAction::Commit => {
                let transaction = self.ledger.commit_transaction(tx)?;
                log::trace!(
                    "[commit] label={} tx={tx} -> new_balance={}",
                    settlement.label(),
                    transaction.balance_after()
                );
            }
            SettlementAction::Fail => {
                self.ledger.fail_transaction(tx, BATCH_FAIL_REASON)?;
            }
        }
        Ok(())
    }
}

impl Ledger {
    /// Primary API: process a command stream with a fresh label namespace.
    pub fn process_commands<R: Read>(&self, reader: R) -> Result<BatchSummary, Error> {
        BatchProcessor::new(self).process(reader)
    }
}
