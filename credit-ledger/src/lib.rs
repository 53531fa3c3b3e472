//! CreditRail Ledger Boundary
//!
//! The mutual-credit ledger owns per-member balances, credit limits, and the
//! pooled network debt. To the credit issuer it is an external service: this
//! crate defines the member identity type, the service interface the issuer
//! consumes, and an in-memory reference implementation used by tests and the
//! demo simulator.
//!
//! # Invariants
//!
//! - Credit conservation: every transfer debits and credits the same amount
//! - A member's balance never drops below the negative of their credit limit
//! - Written-off debt moves to the network debt account, never disappears

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod memory;
pub mod service;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use memory::InMemoryLedger;
pub use service::LedgerService;
pub use types::MemberId;
