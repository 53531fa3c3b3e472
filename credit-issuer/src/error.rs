//! Error types for the credit issuer

use thiserror::Error;

/// Result type for issuer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Issuer errors
///
/// Soft denials are not errors: a frozen member's outgoing transfer makes
/// the validation hook return `Ok(false)` and the ledger skips the balance
/// mutation.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller lacks the required role
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Null or malformed member identity
    #[error("Invalid member: {0}")]
    InvalidMember(String),

    /// Operation requires the period to be out of its active window
    #[error("Period still active: {0}")]
    PeriodActive(String),

    /// Member has no initialized credit line
    #[error("Credit line not initialized: {0}")]
    NotInitialized(String),

    /// Expiration would precede the period start, or a non-positive window
    #[error("Invalid expiration: {0}")]
    InvalidExpiration(String),

    /// Negative fee rate or minimum ITD
    #[error("Invalid credit terms: {0}")]
    InvalidTerms(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration failure
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Ledger service failure
    #[error("Ledger error: {0}")]
    Ledger(#[from] credit_ledger::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
