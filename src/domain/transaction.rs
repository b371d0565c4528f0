use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Cents, CustomerId, decimal_cents};

pub type TransactionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Goods given on credit: increases what the customer owes the store
    Credit,
    /// Payment received: decreases what the customer owes the store
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "CREDIT",
            TransactionKind::Debit => "DEBIT",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREDIT" => Ok(TransactionKind::Credit),
            "DEBIT" => Ok(TransactionKind::Debit),
            other => Err(format!("unknown transaction type '{other}'")),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry in the append-only transaction log.
/// Transactions are immutable once created; there is no edit or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    /// Owning customer; never changes
    pub customer_id: CustomerId,
    /// Display snapshot of the customer at creation time, not used for aggregation
    pub customer_name: String,
    pub customer_mobile: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Amount in cents (always positive)
    #[serde(with = "decimal_cents")]
    pub amount: Cents,
    #[serde(default)]
    pub description: Option<String>,
    /// Business date the transaction is recorded against
    pub transaction_date: NaiveDate,
    /// When the backend recorded the transaction
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl Transaction {
    /// Description for display, with blank text treated as absent.
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Request to append a transaction to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub customer_id: CustomerId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(with = "decimal_cents")]
    pub amount: Cents,
    pub description: Option<String>,
    /// Filled with today's date by the service when absent
    pub transaction_date: Option<NaiveDate>,
}

impl NewTransaction {
    pub fn new(customer_id: CustomerId, kind: TransactionKind, amount: Cents) -> Self {
        Self {
            customer_id,
            kind,
            amount,
            description: None,
            transaction_date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.transaction_date = Some(date);
        self
    }
}
