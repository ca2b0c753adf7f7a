use std::io::Write;

use super::error::Error;
use super::ledger::Ledger;
use super::transaction::TransactionRow;

impl Ledger {
    /// Write account state to any sink (Stdout, File, `TcpStream`, etc.), sorted by account ID.
    /// Note that the CSV writer is buffered automatically, so you should not wrap wtr in a buffered writer like `io::BufWriter`.
    pub fn export_accounts<W: Write>(&self, writer: W) -> Result<(), Error> {
        let accounts = self.accounts();
        log::info!("Exporting {} accounts", accounts.len());

        let mut csv_writer = csv::Writer::from_writer(writer);
        for account in &accounts {
            csv_writer.serialize(account)?;
        }
        csv_writer.flush()?;

        log::trace!("Account export complete");
        Ok(())
    }

    /// Write the transaction log, grouped by account and ordered by ID.
    pub fn export_transactions<W: Write>(&self, writer: W) -> Result<(), Error> {
        let transactions = self.all_transactions();
        log::info!("Exporting {} transactions", transactions.len());

        let mut csv_writer = csv::Writer::from_writer(writer);
        for transaction in &transactions {
            csv_writer.serialize(TransactionRow::from(transaction))?;
        }
        csv_writer.flush()?;

        log::trace!("Transaction export complete");
        Ok(())
    }
}
