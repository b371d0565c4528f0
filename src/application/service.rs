use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::backend::LedgerBackend;
use crate::domain::{
    Customer, CustomerId, LedgerError, NewCustomer, NewTransaction, Transaction, format_cents,
    verify,
};
use crate::statement::{self, RenderOptions};

use super::{AppError, LedgerState};

/// Application service sequencing backend calls and local state.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct LedgerService<B> {
    backend: B,
    state: LedgerState,
}

/// Result of recording a transaction
pub struct RecordedTransaction {
    pub transaction: Transaction,
    /// The owning customer with aggregates including the new transaction
    pub customer: Customer,
}

/// Outcome of comparing stored aggregates with the transaction log
pub struct IntegrityReport {
    pub customers_checked: usize,
    pub transactions_checked: usize,
    pub problems: Vec<LedgerError>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

impl<B: LedgerBackend> LedgerService<B> {
    /// Create a service with empty state. Call [`refresh`](Self::refresh) to load it.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: LedgerState::default(),
        }
    }

    /// Create a service and load the current state from the backend.
    pub async fn connect(backend: B) -> Result<Self, AppError> {
        let mut service = Self::new(backend);
        service.refresh().await?;
        Ok(service)
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Re-read customers and transactions.
    /// The current state is replaced only if both reads succeed.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let (customers, transactions) = tokio::try_join!(
            self.backend.list_customers(),
            self.backend.list_transactions()
        )?;

        let state = LedgerState::new(customers, transactions);
        debug!(
            customers = state.customers().len(),
            transactions = state.transactions().len(),
            "Refreshed ledger state"
        );
        self.state = state;
        Ok(())
    }

    // ========================
    // Customer operations
    // ========================

    /// Register a new customer.
    pub async fn create_customer(
        &mut self,
        name: &str,
        mobile: &str,
    ) -> Result<Customer, AppError> {
        let name = name.trim();
        let mobile = mobile.trim();
        if name.is_empty() {
            return Err(AppError::InvalidCustomer("name is required".to_string()));
        }
        if mobile.is_empty() {
            return Err(AppError::InvalidCustomer("mobile is required".to_string()));
        }

        let record = self
            .backend
            .create_customer(&NewCustomer::new(name, mobile))
            .await?;
        info!(customer_id = record.id, name = %record.name, "Created customer");

        Ok(self.state.add_customer(record).clone())
    }

    /// Get a customer by ID from the current state.
    pub fn customer(&self, id: CustomerId) -> Result<&Customer, AppError> {
        self.state.customer(id).ok_or(AppError::CustomerNotFound(id))
    }

    // ========================
    // Transaction operations
    // ========================

    /// Record a transaction and bring the owning customer's aggregates up to date.
    ///
    /// The created transaction is folded into the local log first, then the
    /// state is re-read. If the re-read fails the locally derived aggregates
    /// are kept. The write has already landed by the time local folding
    /// runs, so a log that can't be folded is logged rather than returned.
    pub async fn create_transaction(
        &mut self,
        request: NewTransaction,
    ) -> Result<RecordedTransaction, AppError> {
        if request.amount <= 0 {
            return Err(AppError::InvalidAmount(format!(
                "amount must be positive, got {}",
                format_cents(request.amount)
            )));
        }

        if self.state.customer(request.customer_id).is_none() {
            // The customer may have been created elsewhere since the last read
            self.refresh().await?;
            self.customer(request.customer_id)?;
        }

        let request = NewTransaction {
            transaction_date: Some(
                request
                    .transaction_date
                    .unwrap_or_else(|| Local::now().date_naive()),
            ),
            ..request
        };

        let transaction = self.backend.create_transaction(&request).await?;
        info!(
            transaction_id = transaction.id,
            customer_id = transaction.customer_id,
            kind = %transaction.kind,
            amount = %format_cents(transaction.amount),
            "Recorded transaction"
        );

        if let Err(err) = self.state.record_transaction(transaction.clone()) {
            warn!(
                transaction_id = transaction.id,
                error = %err,
                "Could not fold transaction into local state"
            );
        }

        if let Err(err) = self.refresh().await {
            warn!(error = %err, "Refresh after recording failed, keeping local aggregates");
        }

        let customer = self.customer(transaction.customer_id)?.clone();
        Ok(RecordedTransaction {
            transaction,
            customer,
        })
    }

    // ========================
    // Integrity operations
    // ========================

    /// Compare the backend's stored aggregates with its transaction log.
    ///
    /// Reads straight from the backend, since the local state is already
    /// reconciled, so it works on a service that was never refreshed. Every
    /// customer is checked and each bad one is reported on its own.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let (customers, transactions) = tokio::try_join!(
            self.backend.list_customers(),
            self.backend.list_transactions()
        )?;

        let problems = customers
            .iter()
            .filter_map(|customer| verify(customer, &transactions).err())
            .collect();

        Ok(IntegrityReport {
            customers_checked: customers.len(),
            transactions_checked: transactions.len(),
            problems,
        })
    }

    // ========================
    // Statement operations
    // ========================

    /// Render a customer's statement as a PDF in `dir` and return its path.
    pub fn export_statement(
        &self,
        customer_id: CustomerId,
        dir: &Path,
        options: &RenderOptions,
    ) -> Result<PathBuf, AppError> {
        let customer = self.customer(customer_id)?;
        let transactions = self.state.customer_transactions(customer_id);
        let generated_at = Local::now().naive_local();

        let path =
            statement::export_statement(customer, &transactions, dir, options, generated_at)?;
        info!(customer_id, path = %path.display(), "Exported statement");
        Ok(path)
    }
}
