//! JSON-over-HTTP client for a remote ledger API.
//!
//! Expects `GET/POST {base}/customers` and `GET/POST {base}/transactions`,
//! with camelCase bodies and money as decimal amounts.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::LedgerBackend;
use crate::domain::{CustomerRecord, NewCustomer, NewTransaction, Transaction};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client rooted at `base_url`, e.g. `http://localhost:8080/api`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {} failed", path))?
            .error_for_status()
            .with_context(|| format!("GET {} was rejected", path))?;

        response
            .json()
            .await
            .with_context(|| format!("GET {} returned an unexpected body", path))
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", path))?
            .error_for_status()
            .with_context(|| format!("POST {} was rejected", path))?;

        response
            .json()
            .await
            .with_context(|| format!("POST {} returned an unexpected body", path))
    }
}

impl LedgerBackend for HttpBackend {
    async fn list_customers(&self) -> Result<Vec<CustomerRecord>> {
        self.get_json("/customers").await
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.get_json("/transactions").await
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<CustomerRecord> {
        self.post_json("/customers", customer).await
    }

    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        self.post_json("/transactions", transaction).await
    }
}
