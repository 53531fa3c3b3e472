//! CreditRail Credit Issuer
//!
//! Time-driven credit-period state machine for a mutual-credit network:
//! extends lines of credit to members, tracks repayment/income behavior over
//! recurring periods, and enforces compliance, freezing, and default when
//! members miss their periodic obligations.
//!
//! # Architecture
//!
//! - **Validation hook**: the ledger calls [`CreditIssuer::validate_transaction`]
//!   before every balance mutation; the issuer allows, defers, or defaults
//! - **Lazy transitions**: no scheduler — expirations apply on the next touch
//! - **Single writer**: concurrent embeddings serialize mutations through
//!   the actor in [`actor`]
//! - **Capability traits**: compliance policy ([`ComplianceEvaluator`]) and
//!   time source ([`Clock`]) are swappable
//!
//! # Invariants
//!
//! - `expiration >= issued_at` for every stored period
//! - Period income is monotonically non-decreasing within a period and
//!   resets only at renewal
//! - Renewal preserves the original period duration exactly
//! - Written-off debt moves to the network, never disappears

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod actor;
pub mod clock;
pub mod compliance;
pub mod config;
pub mod error;
pub mod issuer;
pub mod metrics;
pub mod period;
pub mod terms;
pub mod types;

// Re-exports
pub use actor::{spawn_issuer_actor, InitializeCreditLine, IssuerHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use compliance::{ComplianceEvaluator, StandardCompliance};
pub use config::IssuerConfig;
pub use error::{Error, Result};
pub use issuer::CreditIssuer;
pub use types::{
    CreditEvent, CreditEventKind, CreditPeriod, CreditTerm, PeriodStatus, Role, SyncOutcome,
    ITD_INDETERMINATE,
};
