use std::future::Future;

use anyhow::Result;

use crate::domain::{CustomerRecord, NewCustomer, NewTransaction, Transaction};
use crate::remote::HttpBackend;
use crate::storage::Repository;

/// The persistence contract the ledger core talks to.
///
/// Implementations own id assignment and timestamps. After
/// `create_transaction` returns, the owning customer's stored aggregates
/// must already include the new transaction. Customer totals are returned
/// as stored; callers decide whether to trust them.
pub trait LedgerBackend {
    fn list_customers(&self) -> impl Future<Output = Result<Vec<CustomerRecord>>> + Send;

    fn list_transactions(&self) -> impl Future<Output = Result<Vec<Transaction>>> + Send;

    fn create_customer(
        &self,
        customer: &NewCustomer,
    ) -> impl Future<Output = Result<CustomerRecord>> + Send;

    fn create_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> impl Future<Output = Result<Transaction>> + Send;
}

/// Either of the two shipped backends, picked at startup.
pub enum Backend {
    Local(Repository),
    Remote(HttpBackend),
}

impl LedgerBackend for Backend {
    async fn list_customers(&self) -> Result<Vec<CustomerRecord>> {
        match self {
            Backend::Local(repo) => repo.list_customers().await,
            Backend::Remote(http) => http.list_customers().await,
        }
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        match self {
            Backend::Local(repo) => repo.list_transactions().await,
            Backend::Remote(http) => http.list_transactions().await,
        }
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<CustomerRecord> {
        match self {
            Backend::Local(repo) => repo.create_customer(customer).await,
            Backend::Remote(http) => http.create_customer(customer).await,
        }
    }

    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        match self {
            Backend::Local(repo) => repo.create_transaction(transaction).await,
            Backend::Remote(http) => http.create_transaction(transaction).await,
        }
    }
}
