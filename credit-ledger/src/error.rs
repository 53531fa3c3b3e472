//! Error types for the ledger boundary

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Debug, Error)]
pub enum Error {
    /// Member already has an open credit line
    #[error("Credit line already exists: {0}")]
    CreditLineExists(String),

    /// Transfer would push the sender past their credit limit
    #[error("Credit limit exceeded: {0}")]
    LimitExceeded(String),

    /// Zero or negative amount where a positive one is required
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}
