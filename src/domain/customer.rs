use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Aggregates, BalanceDirection, Cents, LedgerError, decimal_cents};

pub type CustomerId = i64;

/// A store customer with the aggregates derived from their transactions.
///
/// The aggregates are a cache of the transaction log: they can only be set
/// from inside the crate, by the aggregator or by validated deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Doubles as a search key
    pub mobile: String,
    #[serde(flatten)]
    aggregates: Aggregates,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl Customer {
    /// A freshly created customer with zero aggregates.
    pub fn new(id: CustomerId, name: impl Into<String>, mobile: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mobile: mobile.into(),
            aggregates: Aggregates::ZERO,
            created_at: None,
            updated_at: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_aggregates(mut self, aggregates: Aggregates) -> Self {
        self.aggregates = aggregates;
        self
    }

    pub(crate) fn set_aggregates(&mut self, aggregates: Aggregates) {
        self.aggregates = aggregates;
    }

    pub fn aggregates(&self) -> Aggregates {
        self.aggregates
    }

    pub fn total_credit(&self) -> Cents {
        self.aggregates.total_credit()
    }

    pub fn total_debit(&self) -> Cents {
        self.aggregates.total_debit()
    }

    pub fn balance(&self) -> Cents {
        self.aggregates.balance()
    }

    pub fn direction(&self) -> BalanceDirection {
        self.aggregates.direction()
    }

    pub fn is_outstanding(&self) -> bool {
        self.balance() != 0
    }
}

/// A customer exactly as a backend reports it.
///
/// The totals are whatever the backend stored and are not checked on read,
/// so one bad row can't hide the rest of the ledger. Use
/// [`reported`](Self::reported) to validate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: String,
    pub mobile: String,
    #[serde(with = "decimal_cents")]
    pub total_credit: Cents,
    #[serde(with = "decimal_cents")]
    pub total_debit: Cents,
    #[serde(with = "decimal_cents")]
    pub balance: Cents,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl CustomerRecord {
    /// The reported totals, if they satisfy `balance == credit - debit`.
    pub fn reported(&self) -> Result<Aggregates, LedgerError> {
        Aggregates::from_parts(self.total_credit, self.total_debit, self.balance).map_err(
            |err| match err {
                LedgerError::InconsistentAggregates {
                    total_credit,
                    total_debit,
                    balance,
                    ..
                } => LedgerError::InconsistentAggregates {
                    customer_id: Some(self.id),
                    total_credit,
                    total_debit,
                    balance,
                },
                other => other,
            },
        )
    }

    /// Attach aggregates the caller has already settled on.
    pub fn into_customer(self, aggregates: Aggregates) -> Customer {
        Customer {
            id: self.id,
            name: self.name,
            mobile: self.mobile,
            aggregates,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Keep the reported totals, failing if they are inconsistent.
    pub fn into_checked(self) -> Result<Customer, LedgerError> {
        let aggregates = self.reported()?;
        Ok(self.into_customer(aggregates))
    }
}

impl From<Customer> for CustomerRecord {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name,
            mobile: customer.mobile,
            total_credit: customer.aggregates.total_credit(),
            total_debit: customer.aggregates.total_debit(),
            balance: customer.aggregates.balance(),
            created_at: customer.created_at,
            updated_at: customer.updated_at,
        }
    }
}

/// Request to register a new customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub mobile: String,
    /// New customers always start with zero aggregates
    #[serde(flatten)]
    pub(crate) aggregates: Aggregates,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>, mobile: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mobile: mobile.into(),
            aggregates: Aggregates::ZERO,
        }
    }
}
