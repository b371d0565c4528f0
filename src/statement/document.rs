use chrono::NaiveDateTime;

use crate::domain::{
    BalanceDirection, Customer, CustomerId, Transaction, TransactionKind, format_money,
};

use super::RenderOptions;

pub const STATEMENT_TITLE: &str = "Customer Transaction Report";
pub const EMPTY_MESSAGE: &str = "No transactions found for this customer.";
pub const NO_DESCRIPTION: &str = "No description";

const DATE_FORMAT: &str = "%b %d, %Y";
const GENERATED_FORMAT: &str = "%b %d, %Y %H:%M";

/// Everything printed on a statement, already formatted as display text.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub title: String,
    pub customer_name: String,
    pub customer_id: CustomerId,
    pub mobile: String,
    pub summary: StatementSummary,
    pub body: StatementBody,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementSummary {
    pub total_credit: String,
    pub total_debit: String,
    /// Absolute balance; the sign is carried by `direction`
    pub balance: String,
    pub direction: BalanceDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementBody {
    Table(Vec<StatementRow>),
    /// Shown instead of the table when the customer has no transactions
    Empty(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementRow {
    pub date: String,
    pub kind: TransactionKind,
    pub amount: String,
    pub description: String,
}

/// Assemble the statement for one customer.
///
/// `transactions` are printed in the order given, normally most recent
/// first. Entries belonging to other customers are skipped.
pub fn build_statement(
    customer: &Customer,
    transactions: &[&Transaction],
    options: &RenderOptions,
    generated_at: NaiveDateTime,
) -> Statement {
    let symbol = options.currency_symbol.as_str();

    let rows: Vec<StatementRow> = transactions
        .iter()
        .filter(|t| t.customer_id == customer.id)
        .map(|t| StatementRow {
            date: t.transaction_date.format(DATE_FORMAT).to_string(),
            kind: t.kind,
            amount: format_money(symbol, t.amount),
            description: t.description_text().unwrap_or(NO_DESCRIPTION).to_string(),
        })
        .collect();

    let body = if rows.is_empty() {
        StatementBody::Empty(EMPTY_MESSAGE.to_string())
    } else {
        StatementBody::Table(rows)
    };

    Statement {
        title: STATEMENT_TITLE.to_string(),
        customer_name: customer.name.clone(),
        customer_id: customer.id,
        mobile: customer.mobile.clone(),
        summary: StatementSummary {
            total_credit: format_money(symbol, customer.total_credit()),
            total_debit: format_money(symbol, customer.total_debit()),
            balance: format_money(symbol, customer.balance().saturating_abs()),
            direction: customer.direction(),
        },
        body,
        footer: format!("Generated on {}", generated_at.format(GENERATED_FORMAT)),
    }
}
