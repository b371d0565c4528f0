use std::io::Write;

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::application::LedgerState;
use crate::domain::{Customer, LedgerSummary, Transaction, format_cents};

/// Full snapshot of the ledger for backups
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub version: String,
    pub export_date: NaiveDateTime,
    pub total_customers: usize,
    pub total_transactions: usize,
    pub summary: LedgerSummary,
    pub customers: Vec<Customer>,
    pub transactions: Vec<Transaction>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    state: &'a LedgerState,
}

impl<'a> Exporter<'a> {
    pub fn new(state: &'a LedgerState) -> Self {
        Self { state }
    }

    /// Export the transaction log to CSV format
    pub fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "transaction_date",
            "customer_id",
            "customer_name",
            "customer_mobile",
            "type",
            "amount",
            "description",
        ])?;

        let mut count = 0;
        for tx in self.state.transactions() {
            csv_writer.write_record([
                tx.id.to_string(),
                tx.transaction_date.format("%Y-%m-%d").to_string(),
                tx.customer_id.to_string(),
                tx.customer_name.clone(),
                tx.customer_mobile.clone(),
                tx.kind.as_str().to_string(),
                format_cents(tx.amount),
                tx.description.clone().unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export customers with their balances to CSV format
    pub fn export_customers_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "name",
            "mobile",
            "total_credit",
            "total_debit",
            "balance",
        ])?;

        let mut count = 0;
        for customer in self.state.customers() {
            csv_writer.write_record([
                customer.id.to_string(),
                customer.name.clone(),
                customer.mobile.clone(),
                format_cents(customer.total_credit()),
                format_cents(customer.total_debit()),
                format_cents(customer.balance()),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full ledger as a JSON snapshot
    pub fn export_backup_json<W: Write>(&self, mut writer: W) -> Result<BackupSnapshot> {
        let snapshot = BackupSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            export_date: Local::now().naive_local(),
            total_customers: self.state.customers().len(),
            total_transactions: self.state.transactions().len(),
            summary: self.state.summary()?,
            customers: self.state.customers().to_vec(),
            transactions: self.state.transactions().to_vec(),
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
