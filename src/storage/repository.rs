use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDate, NaiveDateTime, SubsecRound};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::backend::LedgerBackend;
use crate::domain::{
    Aggregates, CustomerId, CustomerRecord, NewCustomer, NewTransaction, Transaction,
    TransactionKind, aggregate,
};

use super::MIGRATION_001_INITIAL;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Local SQLite store honouring the same contract as the remote API.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Get a customer by ID, totals as stored.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, mobile, total_credit_cents, total_debit_cents, balance_cents, created_at, updated_at
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    /// Recompute a customer's stored totals from their transactions.
    /// Runs on the caller's connection so it joins the caller's SQL transaction.
    async fn update_customer_totals(
        conn: &mut SqliteConnection,
        customer_id: CustomerId,
        updated_at: NaiveDateTime,
    ) -> Result<Aggregates> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.customer_id, c.name AS customer_name, c.mobile AS customer_mobile,
                   t.kind, t.amount_cents, t.description, t.transaction_date, t.created_at
            FROM transactions t
            JOIN customers c ON c.id = t.customer_id
            WHERE t.customer_id = ?
            "#,
        )
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to load customer transactions")?;

        let transactions = rows
            .iter()
            .map(Self::row_to_transaction)
            .collect::<Result<Vec<_>>>()?;
        let totals = aggregate(customer_id, &transactions)?;

        sqlx::query(
            r#"
            UPDATE customers
            SET total_credit_cents = ?, total_debit_cents = ?, balance_cents = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(totals.total_credit())
        .bind(totals.total_debit())
        .bind(totals.balance())
        .bind(updated_at.format(TIMESTAMP_FORMAT).to_string())
        .bind(customer_id)
        .execute(&mut *conn)
        .await
        .context("Failed to update customer totals")?;

        Ok(totals)
    }

    fn row_to_customer(row: &SqliteRow) -> Result<CustomerRecord> {
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(CustomerRecord {
            id: row.get("id"),
            name: row.get("name"),
            mobile: row.get("mobile"),
            total_credit: row.get("total_credit_cents"),
            total_debit: row.get("total_debit_cents"),
            balance: row.get("balance_cents"),
            created_at: Some(
                NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
                    .context("Invalid created_at timestamp")?,
            ),
            updated_at: Some(
                NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FORMAT)
                    .context("Invalid updated_at timestamp")?,
            ),
        })
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let kind_str: String = row.get("kind");
        let date_str: String = row.get("transaction_date");
        let created_at_str: String = row.get("created_at");

        Ok(Transaction {
            id: row.get("id"),
            customer_id: row.get("customer_id"),
            customer_name: row.get("customer_name"),
            customer_mobile: row.get("customer_mobile"),
            kind: kind_str
                .parse::<TransactionKind>()
                .map_err(|e| anyhow!("Invalid transaction kind: {}", e))?,
            amount: row.get("amount_cents"),
            description: row.get("description"),
            transaction_date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
                .context("Invalid transaction_date")?,
            created_at: Some(
                NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
                    .context("Invalid created_at timestamp")?,
            ),
        })
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

impl LedgerBackend for Repository {
    async fn list_customers(&self) -> Result<Vec<CustomerRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, mobile, total_credit_cents, total_debit_cents, balance_cents, created_at, updated_at
            FROM customers
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.customer_id, c.name AS customer_name, c.mobile AS customer_mobile,
                   t.kind, t.amount_cents, t.description, t.transaction_date, t.created_at
            FROM transactions t
            JOIN customers c ON c.id = t.customer_id
            ORDER BY t.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<CustomerRecord> {
        if customer.name.trim().is_empty() || customer.mobile.trim().is_empty() {
            bail!("Customer name and mobile are required");
        }

        let created_at = now();
        let timestamp = created_at.format(TIMESTAMP_FORMAT).to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO customers (name, mobile, total_credit_cents, total_debit_cents, balance_cents, created_at, updated_at)
            VALUES (?, ?, 0, 0, 0, ?, ?)
            "#,
        )
        .bind(customer.name.trim())
        .bind(customer.mobile.trim())
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await
        .context("Failed to save customer")?;

        Ok(CustomerRecord {
            id: result.last_insert_rowid(),
            name: customer.name.trim().to_string(),
            mobile: customer.mobile.trim().to_string(),
            total_credit: 0,
            total_debit: 0,
            balance: 0,
            created_at: Some(created_at),
            updated_at: Some(created_at),
        })
    }

    /// Append a transaction and recompute the owner's totals atomically.
    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        if transaction.amount <= 0 {
            bail!("Transaction amount must be positive");
        }

        let created_at = now();
        let transaction_date = transaction
            .transaction_date
            .unwrap_or_else(|| created_at.date());

        let mut db = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let owner = sqlx::query("SELECT name, mobile FROM customers WHERE id = ?")
            .bind(transaction.customer_id)
            .fetch_optional(&mut *db)
            .await
            .context("Failed to fetch customer")?
            .ok_or_else(|| anyhow!("Customer not found: {}", transaction.customer_id))?;

        let result = sqlx::query(
            r#"
            INSERT INTO transactions (customer_id, kind, amount_cents, description, transaction_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.customer_id)
        .bind(transaction.kind.as_str())
        .bind(transaction.amount)
        .bind(&transaction.description)
        .bind(transaction_date.format(DATE_FORMAT).to_string())
        .bind(created_at.format(TIMESTAMP_FORMAT).to_string())
        .execute(&mut *db)
        .await
        .context("Failed to save transaction")?;

        Self::update_customer_totals(&mut db, transaction.customer_id, created_at).await?;

        db.commit().await.context("Failed to commit transaction")?;

        Ok(Transaction {
            id: result.last_insert_rowid(),
            customer_id: transaction.customer_id,
            customer_name: owner.get("name"),
            customer_mobile: owner.get("mobile"),
            kind: transaction.kind,
            amount: transaction.amount,
            description: transaction.description.clone(),
            transaction_date,
            created_at: Some(created_at),
        })
    }
}
