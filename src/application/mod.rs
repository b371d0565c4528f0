// Application layer: owned ledger state and the use cases that drive it.

pub mod error;
pub mod service;
pub mod state;

pub use error::*;
pub use service::*;
pub use state::*;
