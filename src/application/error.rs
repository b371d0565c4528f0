use thiserror::Error;

use crate::domain::{CustomerId, LedgerError};
use crate::statement::RenderError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Invalid customer: {0}")]
    InvalidCustomer(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Statement export failed: {0}")]
    Render(#[from] RenderError),

    #[error("Backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}
