use std::fs::File;
use std::io::{Write, stdout};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::error;

use crate::application::{AppError, LedgerService};
use crate::backend::{Backend, LedgerBackend};
use crate::domain::{
    CustomerId, NewTransaction, TransactionKind, filter_transactions, format_cents, format_money,
    latest_transaction, parse_cents, search_customers,
};
use crate::io::Exporter;
use crate::remote::HttpBackend;
use crate::statement::RenderOptions;
use crate::storage::Repository;

/// Khata - Customer Credit Ledger
#[derive(Parser)]
#[command(name = "khata")]
#[command(about = "A local-first customer credit ledger with printable account statements")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "KHATA_DATABASE", default_value = "khata.db")]
    pub database: String,

    /// Base URL of a remote ledger API (e.g. http://localhost:8080/api).
    /// When set, the local database is not used.
    #[arg(long, env = "KHATA_API_URL")]
    pub api_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Record a credit or debit for a customer
    Record {
        /// Customer ID
        customer_id: CustomerId,

        /// Transaction type: credit (goods given) or debit (payment received)
        kind: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Description of the transaction
        #[arg(short, long)]
        description: Option<String>,

        /// Transaction date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List transactions, most recent first
    Transactions {
        /// Only this customer's transactions
        #[arg(long)]
        customer: Option<CustomerId>,

        /// Filter by type: credit or debit
        #[arg(long = "type")]
        kind: Option<String>,

        /// Filter by customer name or mobile
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show store-wide totals
    Dashboard,

    /// List customers with a non-zero balance, largest first
    Outstanding,

    /// Verify stored balances against the transaction log
    Check,

    /// Export a customer's statement as a PDF
    Statement {
        /// Customer ID
        customer_id: CustomerId,

        /// Directory to write the PDF into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: transactions, customers, backup
        export_type: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a new customer
    Add {
        /// Customer name
        name: String,

        /// Mobile number
        mobile: String,
    },

    /// List customers
    List {
        /// Filter by name or mobile
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show customer details
    Show {
        /// Customer ID
        id: CustomerId,
    },
}

impl Cli {
    async fn backend(&self) -> Result<Backend> {
        match &self.api_url {
            Some(url) => Ok(Backend::Remote(HttpBackend::new(url)?)),
            None => {
                let db_url = format!("sqlite:{}", self.database);
                let repo = Repository::connect(&db_url)
                    .await
                    .with_context(|| format!("Run 'khata init' to create {}", self.database))?;
                Ok(Backend::Local(repo))
            }
        }
    }

    async fn service(&self) -> Result<LedgerService<Backend>> {
        let backend = self.backend().await?;
        Ok(LedgerService::connect(backend).await?)
    }

    pub async fn run(self) -> Result<()> {
        match &self.command {
            Commands::Init => {
                if self.api_url.is_some() {
                    bail!("'init' only applies to the local database; unset --api-url");
                }
                let db_url = format!("sqlite:{}?mode=rwc", self.database);
                Repository::init(&db_url).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Customer(cmd) => {
                let mut service = self.service().await?;
                run_customer_command(&mut service, cmd).await?;
            }

            Commands::Record {
                customer_id,
                kind,
                amount,
                description,
                date,
            } => {
                let mut service = self.service().await?;
                let kind: TransactionKind = kind.parse().map_err(|e| {
                    anyhow!("Invalid transaction type. Valid types: credit, debit. Error: {}", e)
                })?;
                let amount_cents =
                    parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let mut request = NewTransaction::new(*customer_id, kind, amount_cents);
                if let Some(desc) = description {
                    request = request.with_description(desc.clone());
                }
                if let Some(date_str) = date {
                    request = request.on(parse_date(date_str).with_context(|| {
                        format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                    })?);
                }

                let recorded = service.create_transaction(request).await?;
                let customer = &recorded.customer;
                println!(
                    "Recorded {} of {} for {} ({})",
                    recorded.transaction.kind,
                    format_cents(recorded.transaction.amount),
                    customer.name,
                    recorded.transaction.id
                );
                println!(
                    "Balance: {} ({})",
                    format_cents(customer.balance().saturating_abs()),
                    customer.direction()
                );
            }

            Commands::Transactions {
                customer,
                kind,
                search,
                limit,
            } => {
                let service = self.service().await?;
                run_transactions_command(
                    &service,
                    *customer,
                    kind.as_deref(),
                    search.as_deref(),
                    *limit,
                )?;
            }

            Commands::Dashboard => {
                let service = self.service().await?;
                run_dashboard_command(&service)?;
            }

            Commands::Outstanding => {
                let service = self.service().await?;
                run_outstanding_command(&service);
            }

            Commands::Check => {
                // Skips the initial load so bad rows still get reported
                let service = LedgerService::new(self.backend().await?);
                run_check_command(&service).await?;
            }

            Commands::Statement {
                customer_id,
                output,
            } => {
                let service = self.service().await?;
                let options = RenderOptions::default();

                match service.export_statement(*customer_id, output, &options) {
                    Ok(path) => println!("Statement saved: {}", path.display()),
                    Err(AppError::Render(err)) => {
                        error!(customer_id, error = %err, "Statement export failed");
                        bail!(err.user_message());
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = self.service().await?;
                run_export_command(&service, export_type, output.as_deref())?;
            }
        }

        Ok(())
    }
}

async fn run_customer_command<B: LedgerBackend>(
    service: &mut LedgerService<B>,
    cmd: &CustomerCommands,
) -> Result<()> {
    match cmd {
        CustomerCommands::Add { name, mobile } => {
            let customer = service.create_customer(name, mobile).await?;
            println!("Created customer: {} ({})", customer.name, customer.id);
        }

        CustomerCommands::List { search } => {
            let customers = service.state().customers();
            let customers = match search {
                Some(term) => search_customers(customers, term),
                None => customers.iter().collect(),
            };

            if customers.is_empty() {
                println!("No customers found.");
            } else {
                println!(
                    "{:<6} {:<20} {:<15} {:>14} STATUS",
                    "ID", "NAME", "MOBILE", "BALANCE"
                );
                println!("{}", "-".repeat(68));
                for customer in customers {
                    println!(
                        "{:<6} {:<20} {:<15} {:>14} {}",
                        customer.id,
                        truncate(&customer.name, 20),
                        truncate(&customer.mobile, 15),
                        format_cents(customer.balance().saturating_abs()),
                        customer.direction()
                    );
                }
            }
        }

        CustomerCommands::Show { id } => {
            let customer = service.customer(*id)?;
            let transactions = service.state().customer_transactions(*id);

            println!("Customer: {}", customer.name);
            println!("  ID:           {}", customer.id);
            println!("  Mobile:       {}", customer.mobile);
            if let Some(created) = customer.created_at {
                println!("  Created:      {}", created.format("%Y-%m-%d %H:%M:%S"));
            }
            println!();
            println!("  Total credit: {}", format_cents(customer.total_credit()));
            println!("  Total debit:  {}", format_cents(customer.total_debit()));
            println!(
                "  Balance:      {} ({})",
                format_cents(customer.balance().saturating_abs()),
                customer.direction()
            );
            println!("  Transactions: {}", transactions.len());
            if let Some(last) = latest_transaction(*id, service.state().transactions()) {
                println!(
                    "  Last activity: {} {} {}",
                    last.transaction_date.format("%Y-%m-%d"),
                    last.kind,
                    format_cents(last.amount)
                );
            }
        }
    }
    Ok(())
}

fn run_transactions_command<B: LedgerBackend>(
    service: &LedgerService<B>,
    customer: Option<CustomerId>,
    kind: Option<&str>,
    search: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let kind = kind
        .map(str::parse::<TransactionKind>)
        .transpose()
        .map_err(|e| anyhow!("Invalid transaction type: {}", e))?;

    let state = service.state();
    let mut transactions = filter_transactions(state.transactions(), search, kind);
    if let Some(id) = customer {
        service.customer(id)?;
        transactions.retain(|t| t.customer_id == id);
    }
    // Most recent first, ties in log order
    transactions.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
    if let Some(limit) = limit {
        transactions.truncate(limit);
    }

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:<12} {:<20} {:<7} {:>12} DESCRIPTION",
        "DATE", "CUSTOMER", "TYPE", "AMOUNT"
    );
    println!("{}", "-".repeat(70));
    for tx in transactions {
        println!(
            "{:<12} {:<20} {:<7} {:>12} {}",
            tx.transaction_date.format("%Y-%m-%d"),
            truncate(&tx.customer_name, 20),
            tx.kind,
            format_cents(tx.amount),
            truncate(tx.description_text().unwrap_or(""), 30)
        );
    }
    Ok(())
}

fn run_dashboard_command<B: LedgerBackend>(service: &LedgerService<B>) -> Result<()> {
    let summary = service.state().summary()?;

    println!("Customers:      {}", summary.total_customers);
    println!("  owing you:    {}", summary.customers_owing);
    println!("  you owe:      {}", summary.customers_owed);
    println!();
    println!("Total credit:   {:>14}", format_money("", summary.total_credit));
    println!("Total debit:    {:>14}", format_money("", summary.total_debit));
    println!("{}", "-".repeat(30));
    println!("Net balance:    {:>14}", format_money("", summary.net_balance));
    println!("Transactions:   {}", service.state().transactions().len());
    Ok(())
}

fn run_outstanding_command<B: LedgerBackend>(service: &LedgerService<B>) {
    let outstanding = service.state().outstanding();
    if outstanding.is_empty() {
        println!("No outstanding balances.");
        return;
    }

    println!("{:<6} {:<20} {:<15} {:>14} STATUS", "ID", "NAME", "MOBILE", "BALANCE");
    println!("{}", "-".repeat(68));
    for customer in outstanding {
        println!(
            "{:<6} {:<20} {:<15} {:>14} {}",
            customer.id,
            truncate(&customer.name, 20),
            truncate(&customer.mobile, 15),
            format_money("", customer.balance().saturating_abs()),
            customer.direction()
        );
    }
}

async fn run_check_command<B: LedgerBackend>(service: &LedgerService<B>) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Customers:    {}", report.customers_checked);
    println!("Transactions: {}", report.transactions_checked);
    println!();

    if report.is_ok() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.problems {
            println!("  - {}", issue);
        }
        bail!("Ledger integrity check failed");
    }

    Ok(())
}

fn run_export_command<B: LedgerBackend>(
    service: &LedgerService<B>,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    let exporter = Exporter::new(service.state());

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let count = exporter.export_transactions_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "customers" => {
            let count = exporter.export_customers_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} customers", count);
            }
        }
        "backup" => {
            let snapshot = exporter.export_backup_json(writer)?;
            if output.is_some() {
                eprintln!(
                    "Exported backup: {} customers, {} transactions",
                    snapshot.total_customers, snapshot.total_transactions
                );
            }
        }
        _ => {
            bail!(
                "Invalid export type '{}'. Valid types: transactions, customers, backup",
                export_type
            );
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}
