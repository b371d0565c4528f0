use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    Cents, Customer, CustomerId, CustomerRecord, Transaction, TransactionId, TransactionKind,
    decimal_cents, format_cents,
};

/// Which way a balance points, from the store's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceDirection {
    /// Positive balance: the customer owes the store
    OwesYou,
    /// Negative balance: the store owes the customer
    YouOwe,
    Settled,
}

impl BalanceDirection {
    pub fn of(balance: Cents) -> Self {
        match balance {
            b if b > 0 => BalanceDirection::OwesYou,
            b if b < 0 => BalanceDirection::YouOwe,
            _ => BalanceDirection::Settled,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BalanceDirection::OwesYou => "Owes You",
            BalanceDirection::YouOwe => "You Owe",
            BalanceDirection::Settled => "Settled",
        }
    }
}

impl fmt::Display for BalanceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Customer-level totals derived from the transaction log.
///
/// `balance == total_credit - total_debit` holds for every value of this type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AggregateFields", into = "AggregateFields")]
pub struct Aggregates {
    total_credit: Cents,
    total_debit: Cents,
    balance: Cents,
}

impl Aggregates {
    pub const ZERO: Aggregates = Aggregates {
        total_credit: 0,
        total_debit: 0,
        balance: 0,
    };

    /// Rebuild aggregates reported by a backend, checking the invariant.
    pub fn from_parts(
        total_credit: Cents,
        total_debit: Cents,
        balance: Cents,
    ) -> Result<Self, LedgerError> {
        let consistent = total_credit >= 0
            && total_debit >= 0
            && total_credit.checked_sub(total_debit) == Some(balance);
        if !consistent {
            return Err(LedgerError::InconsistentAggregates {
                customer_id: None,
                total_credit,
                total_debit,
                balance,
            });
        }
        Ok(Self {
            total_credit,
            total_debit,
            balance,
        })
    }

    pub fn total_credit(&self) -> Cents {
        self.total_credit
    }

    pub fn total_debit(&self) -> Cents {
        self.total_debit
    }

    pub fn balance(&self) -> Cents {
        self.balance
    }

    pub fn direction(&self) -> BalanceDirection {
        BalanceDirection::of(self.balance)
    }

    /// Fold one more transaction into the totals.
    /// A credit adds to `total_credit` and `balance`; a debit adds to
    /// `total_debit` and subtracts from `balance`.
    pub fn apply(self, kind: TransactionKind, amount: Cents) -> Result<Self, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::NonPositiveAmount {
                transaction_id: None,
                amount,
            });
        }

        let next = match kind {
            TransactionKind::Credit => self.total_credit.checked_add(amount).and_then(|credit| {
                Some(Self {
                    total_credit: credit,
                    balance: self.balance.checked_add(amount)?,
                    ..self
                })
            }),
            TransactionKind::Debit => self.total_debit.checked_add(amount).and_then(|debit| {
                Some(Self {
                    total_debit: debit,
                    balance: self.balance.checked_sub(amount)?,
                    ..self
                })
            }),
        };

        next.ok_or(LedgerError::Overflow)
    }

    fn apply_transaction(self, transaction: &Transaction) -> Result<Self, LedgerError> {
        self.apply(transaction.kind, transaction.amount)
            .map_err(|err| match err {
                LedgerError::NonPositiveAmount { amount, .. } => LedgerError::NonPositiveAmount {
                    transaction_id: Some(transaction.id),
                    amount,
                },
                other => other,
            })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateFields {
    #[serde(with = "decimal_cents")]
    total_credit: Cents,
    #[serde(with = "decimal_cents")]
    total_debit: Cents,
    #[serde(with = "decimal_cents")]
    balance: Cents,
}

impl TryFrom<AggregateFields> for Aggregates {
    type Error = LedgerError;

    fn try_from(fields: AggregateFields) -> Result<Self, Self::Error> {
        Aggregates::from_parts(fields.total_credit, fields.total_debit, fields.balance)
    }
}

impl From<Aggregates> for AggregateFields {
    fn from(aggregates: Aggregates) -> Self {
        Self {
            total_credit: aggregates.total_credit,
            total_debit: aggregates.total_debit,
            balance: aggregates.balance,
        }
    }
}

/// Compute the aggregates for one customer from the full transaction log.
/// Transactions belonging to other customers are ignored; no match means zero.
pub fn aggregate(
    customer_id: CustomerId,
    transactions: &[Transaction],
) -> Result<Aggregates, LedgerError> {
    transactions
        .iter()
        .filter(|t| t.customer_id == customer_id)
        .try_fold(Aggregates::ZERO, Aggregates::apply_transaction)
}

/// Compute aggregates for every customer that appears in the log.
/// Customers with no transactions won't be in the map (aggregates = zero).
pub fn aggregate_all(
    transactions: &[Transaction],
) -> Result<HashMap<CustomerId, Aggregates>, LedgerError> {
    let mut totals: HashMap<CustomerId, Aggregates> = HashMap::new();

    for transaction in transactions {
        let entry = totals.entry(transaction.customer_id).or_default();
        *entry = entry.apply_transaction(transaction)?;
    }

    Ok(totals)
}

/// Check a customer's stored aggregates against the log.
///
/// Fails if the stored totals are inconsistent with each other, if the
/// customer's part of the log can't be folded, or if the two disagree.
pub fn verify(
    customer: &CustomerRecord,
    transactions: &[Transaction],
) -> Result<(), LedgerError> {
    let stored = customer.reported()?;
    let derived = aggregate(customer.id, transactions)?;
    if derived != stored {
        return Err(LedgerError::Drift {
            customer_id: customer.id,
            stored,
            derived,
        });
    }
    Ok(())
}

/// Customers with a non-zero balance, largest absolute balance first.
/// Ties keep their input order.
pub fn rank_outstanding(customers: &[Customer]) -> Vec<&Customer> {
    let mut outstanding: Vec<&Customer> =
        customers.iter().filter(|c| c.is_outstanding()).collect();
    outstanding.sort_by(|a, b| b.balance().unsigned_abs().cmp(&a.balance().unsigned_abs()));
    outstanding
}

/// One customer's transactions, most recent `transaction_date` first.
/// Transactions on the same date keep their log order.
pub fn customer_transactions(
    customer_id: CustomerId,
    transactions: &[Transaction],
) -> Vec<&Transaction> {
    let mut selected: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.customer_id == customer_id)
        .collect();
    selected.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
    selected
}

pub fn latest_transaction(
    customer_id: CustomerId,
    transactions: &[Transaction],
) -> Option<&Transaction> {
    customer_transactions(customer_id, transactions)
        .into_iter()
        .next()
}

/// Store-wide totals shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    #[serde(with = "decimal_cents")]
    pub total_credit: Cents,
    #[serde(with = "decimal_cents")]
    pub total_debit: Cents,
    #[serde(with = "decimal_cents")]
    pub net_balance: Cents,
    pub total_customers: usize,
    /// Customers with a positive balance
    pub customers_owing: usize,
    /// Customers with a negative balance
    pub customers_owed: usize,
}

pub fn summarize(customers: &[Customer]) -> Result<LedgerSummary, LedgerError> {
    let mut summary = LedgerSummary {
        total_customers: customers.len(),
        ..LedgerSummary::default()
    };

    for customer in customers {
        summary.total_credit = summary
            .total_credit
            .checked_add(customer.total_credit())
            .ok_or(LedgerError::Overflow)?;
        summary.total_debit = summary
            .total_debit
            .checked_add(customer.total_debit())
            .ok_or(LedgerError::Overflow)?;
        match customer.direction() {
            BalanceDirection::OwesYou => summary.customers_owing += 1,
            BalanceDirection::YouOwe => summary.customers_owed += 1,
            BalanceDirection::Settled => {}
        }
    }

    summary.net_balance = summary
        .total_credit
        .checked_sub(summary.total_debit)
        .ok_or(LedgerError::Overflow)?;
    Ok(summary)
}

/// Customers whose name contains `term` (case-insensitive) or whose mobile contains it.
pub fn search_customers<'a>(customers: &'a [Customer], term: &str) -> Vec<&'a Customer> {
    let needle = term.trim().to_lowercase();
    customers
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle) || c.mobile.contains(term.trim()))
        .collect()
}

/// Transactions matching a customer name/mobile search term and an optional type.
pub fn filter_transactions<'a>(
    transactions: &'a [Transaction],
    term: Option<&str>,
    kind: Option<TransactionKind>,
) -> Vec<&'a Transaction> {
    let needle = term.map(|t| t.trim().to_lowercase()).unwrap_or_default();
    transactions
        .iter()
        .filter(|t| {
            needle.is_empty()
                || t.customer_name.to_lowercase().contains(&needle)
                || t.customer_mobile.contains(&needle)
        })
        .filter(|t| kind.is_none_or(|k| t.kind == k))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    NonPositiveAmount {
        transaction_id: Option<TransactionId>,
        amount: Cents,
    },
    Overflow,
    Drift {
        customer_id: CustomerId,
        stored: Aggregates,
        derived: Aggregates,
    },
    InconsistentAggregates {
        customer_id: Option<CustomerId>,
        total_credit: Cents,
        total_debit: Cents,
        balance: Cents,
    },
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NonPositiveAmount {
                transaction_id: Some(id),
                amount,
            } => write!(
                f,
                "transaction {} has a non-positive amount ({})",
                id,
                format_cents(*amount)
            ),
            LedgerError::NonPositiveAmount {
                transaction_id: None,
                amount,
            } => write!(f, "amount must be positive, got {}", format_cents(*amount)),
            LedgerError::Overflow => write!(f, "ledger totals out of range"),
            LedgerError::Drift {
                customer_id,
                stored,
                derived,
            } => write!(
                f,
                "customer {} balance drifted from its transactions: stored {}, derived {}",
                customer_id,
                format_cents(stored.balance),
                format_cents(derived.balance)
            ),
            LedgerError::InconsistentAggregates {
                customer_id,
                total_credit,
                total_debit,
                balance,
            } => {
                if let Some(id) = customer_id {
                    write!(f, "customer {} has ", id)?;
                }
                write!(
                    f,
                    "inconsistent aggregates: credit {} - debit {} != balance {}",
                    format_cents(*total_credit),
                    format_cents(*total_debit),
                    format_cents(*balance)
                )
            }
        }
    }
}

impl std::error::Error for LedgerError {}
