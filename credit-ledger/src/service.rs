//! Ledger service interface consumed by the credit issuer
//!
//! The production ledger owns balance storage and transfer mechanics; the
//! issuer only queries balances/limits and directs credit-line mutations
//! through this trait.

use crate::{MemberId, Result};
use rust_decimal::Decimal;

/// Mutual-credit ledger operations the issuer depends on
pub trait LedgerService: Send + Sync {
    /// Outstanding credit balance (used credit) of a member
    ///
    /// Zero when the member holds a non-negative balance.
    fn outstanding_balance(&self, member: &MemberId) -> Result<Decimal>;

    /// Credit limit of a member
    fn credit_limit(&self, member: &MemberId) -> Result<Decimal>;

    /// Pooled unpaid balance absorbed by the network
    fn network_debt(&self) -> Result<Decimal>;

    /// Set a member's credit limit
    fn set_credit_limit(&self, member: &MemberId, amount: Decimal) -> Result<()>;

    /// Open a credit line with the given limit
    ///
    /// A positive `initial_balance` is credited to the member with the
    /// matching debt assigned to the network debt account. Fails if the
    /// member already has a credit line with a non-zero limit.
    fn create_credit_line(
        &self,
        member: &MemberId,
        limit: Decimal,
        initial_balance: Decimal,
    ) -> Result<()>;

    /// Write off a member's outstanding balance to network debt
    ///
    /// Returns the amount written off.
    fn write_off_balance(&self, member: &MemberId) -> Result<Decimal>;
}
