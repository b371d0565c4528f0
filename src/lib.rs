pub mod application;
pub mod backend;
pub mod cli;
pub mod domain;
pub mod io;
pub mod remote;
pub mod statement;
pub mod storage;

pub use application::{AppError, LedgerService, LedgerState};
pub use backend::{Backend, LedgerBackend};
pub use domain::*;
pub use remote::HttpBackend;
pub use storage::Repository;
