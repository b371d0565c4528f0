// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use khata::domain::{
    Customer, CustomerId, CustomerRecord, NewCustomer, NewTransaction, Transaction,
    TransactionKind, format_cents,
};
use khata::{LedgerBackend, LedgerService, Repository};
use serde_json::json;
use tempfile::TempDir;

/// Helper to create a repository backed by a temporary database
pub async fn test_repository() -> Result<(Repository, TempDir)> {
    let (repo, _, temp_dir) = test_repository_with_url().await?;
    Ok((repo, temp_dir))
}

/// Like `test_repository`, also returning the database URL so a test can
/// open its own connection and tamper with rows
pub async fn test_repository_with_url() -> Result<(Repository, String, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let repo = Repository::init(&db_url).await?;
    Ok((repo, db_url, temp_dir))
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService<Repository>, TempDir)> {
    let (repo, temp_dir) = test_repository().await?;
    let service = LedgerService::connect(repo).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// A customer record as a backend would send it, totals taken at face value
pub fn customer_record(
    id: CustomerId,
    name: &str,
    credit: i64,
    debit: i64,
    balance: i64,
) -> CustomerRecord {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "mobile": format!("555-{:04}", id),
        "totalCredit": format_cents(credit),
        "totalDebit": format_cents(debit),
        "balance": format_cents(balance),
    }))
    .unwrap()
}

/// A customer with consistent reported aggregates
pub fn reported_customer(id: CustomerId, name: &str, credit: i64, debit: i64) -> Customer {
    customer_record(id, name, credit, debit, credit - debit)
        .into_checked()
        .unwrap()
}

pub fn make_transaction(
    id: i64,
    customer_id: CustomerId,
    kind: TransactionKind,
    amount: i64,
    on: &str,
) -> Transaction {
    Transaction {
        id,
        customer_id,
        customer_name: format!("Customer {}", customer_id),
        customer_mobile: format!("555-{:04}", customer_id),
        kind,
        amount,
        description: None,
        transaction_date: date(on),
        created_at: None,
    }
}

/// Wraps a backend and fails reads or writes on demand
pub struct FlakyBackend<B> {
    pub inner: B,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl<B> FlakyBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(())
    }
}

impl<B: LedgerBackend + Sync> LedgerBackend for FlakyBackend<B> {
    async fn list_customers(&self) -> Result<Vec<CustomerRecord>> {
        self.check_reads()?;
        self.inner.list_customers().await
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.check_reads()?;
        self.inner.list_transactions().await
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<CustomerRecord> {
        self.check_writes()?;
        self.inner.create_customer(customer).await
    }

    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        self.check_writes()?;
        self.inner.create_transaction(transaction).await
    }
}

/// An in-memory backend that never updates stored customer totals,
/// like a server whose aggregate update was lost.
#[derive(Default)]
pub struct StaleBackend {
    customers: Mutex<Vec<CustomerRecord>>,
    transactions: Mutex<Vec<Transaction>>,
}

impl StaleBackend {
    pub fn with_data(customers: Vec<CustomerRecord>, transactions: Vec<Transaction>) -> Self {
        Self {
            customers: Mutex::new(customers),
            transactions: Mutex::new(transactions),
        }
    }
}

impl LedgerBackend for StaleBackend {
    async fn list_customers(&self) -> Result<Vec<CustomerRecord>> {
        Ok(self.customers.lock().unwrap().clone())
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.lock().unwrap().clone())
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<CustomerRecord> {
        let mut customers = self.customers.lock().unwrap();
        let created = CustomerRecord::from(Customer::new(
            customers.len() as i64 + 1,
            customer.name.clone(),
            customer.mobile.clone(),
        ));
        customers.push(created.clone());
        Ok(created)
    }

    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        let customer = self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == transaction.customer_id)
            .cloned()
            .ok_or_else(|| anyhow!("Customer not found: {}", transaction.customer_id))?;

        let mut transactions = self.transactions.lock().unwrap();
        let created = Transaction {
            id: transactions.len() as i64 + 1,
            customer_id: customer.id,
            customer_name: customer.name,
            customer_mobile: customer.mobile,
            kind: transaction.kind,
            amount: transaction.amount,
            description: transaction.description.clone(),
            transaction_date: transaction
                .transaction_date
                .unwrap_or_else(|| date("2024-01-01")),
            created_at: None,
        };
        transactions.push(created.clone());
        Ok(created)
    }
}
