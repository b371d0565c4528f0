use tracing::warn;

use crate::domain::{
    Aggregates, Customer, CustomerId, CustomerRecord, LedgerError, LedgerSummary, Transaction,
    aggregate, customer_transactions, format_cents, rank_outstanding, summarize,
};

use super::AppError;

/// The customers and transaction log as last seen from the backend.
///
/// Customer aggregates held here agree with the log whenever the log can be
/// folded: they are recomputed whenever the state is built or a transaction
/// is recorded.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    customers: Vec<Customer>,
    transactions: Vec<Transaction>,
}

impl LedgerState {
    /// Build a state from freshly fetched collections, reconciling the
    /// reported aggregates against the log.
    ///
    /// Bad data is logged, never fatal: the log wins over reported totals,
    /// and a customer whose log can't be folded keeps consistent reported
    /// totals or falls back to zero.
    pub fn new(records: Vec<CustomerRecord>, transactions: Vec<Transaction>) -> Self {
        let customers = records
            .into_iter()
            .map(|record| {
                let aggregates = reconcile(&record, &transactions);
                record.into_customer(aggregates)
            })
            .collect();

        Self {
            customers,
            transactions,
        }
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn customer(&self, id: CustomerId) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    /// A customer's transactions, most recent first.
    pub fn customer_transactions(&self, id: CustomerId) -> Vec<&Transaction> {
        customer_transactions(id, &self.transactions)
    }

    /// Customers with a non-zero balance, largest first.
    pub fn outstanding(&self) -> Vec<&Customer> {
        rank_outstanding(&self.customers)
    }

    pub fn summary(&self) -> Result<LedgerSummary, LedgerError> {
        summarize(&self.customers)
    }

    /// Insert a newly created customer, replacing any stale copy with the same id.
    /// Its aggregates are taken from the log.
    pub fn add_customer(&mut self, record: CustomerRecord) -> &Customer {
        let aggregates = reconcile(&record, &self.transactions);
        let customer = record.into_customer(aggregates);
        let index = match self.customers.iter().position(|c| c.id == customer.id) {
            Some(index) => {
                self.customers[index] = customer;
                index
            }
            None => {
                self.customers.push(customer);
                self.customers.len() - 1
            }
        };
        &self.customers[index]
    }

    /// Append a created transaction and recompute its customer's aggregates.
    ///
    /// Nothing changes if the customer is unknown or the new totals can't
    /// be computed.
    pub fn record_transaction(
        &mut self,
        transaction: Transaction,
    ) -> Result<&Customer, AppError> {
        let index = self
            .customers
            .iter()
            .position(|c| c.id == transaction.customer_id)
            .ok_or(AppError::CustomerNotFound(transaction.customer_id))?;

        let already_recorded = self.transactions.iter().any(|t| t.id == transaction.id);
        let mut derived = aggregate(transaction.customer_id, &self.transactions)?;
        if !already_recorded {
            derived = derived.apply(transaction.kind, transaction.amount)?;
            self.transactions.push(transaction);
        }
        let customer = &mut self.customers[index];
        customer.set_aggregates(derived);
        Ok(customer)
    }

}

/// Settle on the aggregates to hold for one reported customer.
fn reconcile(record: &CustomerRecord, transactions: &[Transaction]) -> Aggregates {
    let reported = record.reported();
    match aggregate(record.id, transactions) {
        Ok(derived) => {
            if reported.as_ref() != Ok(&derived) {
                warn!(
                    customer_id = record.id,
                    reported = %format_cents(record.balance),
                    derived = %format_cents(derived.balance()),
                    "Reported balance disagrees with transaction log, using log"
                );
            }
            derived
        }
        Err(err) => {
            warn!(
                customer_id = record.id,
                error = %err,
                "Transaction log can't be folded, falling back to reported totals"
            );
            reported.unwrap_or_else(|err| {
                warn!(
                    customer_id = record.id,
                    error = %err,
                    "Reported totals unusable, using zero"
                );
                Aggregates::ZERO
            })
        }
    }
}
