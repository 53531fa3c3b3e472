//! Income-to-debt compliance arithmetic
//!
//! Pure functions of a member's terms and outstanding ledger balance. The
//! evaluator is a capability trait: variant policies (e.g. a different
//! income notion) compose with the issuer instead of extending it.

use crate::types::{CreditTerm, ITD_INDETERMINATE};
use rust_decimal::Decimal;

/// Compliance policy consulted by the issuer
pub trait ComplianceEvaluator: Send + Sync {
    /// Income-to-debt ratio
    ///
    /// Zero while no income has been received this period;
    /// [`ITD_INDETERMINATE`] when there is no outstanding debt.
    fn itd_of(&self, term: &CreditTerm, outstanding: Decimal) -> Decimal;

    /// Whether the ratio meets the member's minimum
    fn has_valid_itd(&self, term: &CreditTerm, outstanding: Decimal) -> bool {
        let itd = self.itd_of(term, outstanding);
        itd == ITD_INDETERMINATE || itd >= term.min_itd
    }

    /// Whether the member currently satisfies their period obligations
    ///
    /// Rebalancing is a full-coverage alternative path: fully repaying the
    /// outstanding balance within the period satisfies obligations
    /// regardless of the ratio.
    fn in_compliance(&self, term: &CreditTerm, outstanding: Decimal) -> bool {
        term.rebalanced || self.has_valid_itd(term, outstanding)
    }

    /// Minimal additional income restoring a valid ratio
    ///
    /// Zero when the member is already compliant.
    fn needed_income_of(&self, term: &CreditTerm, outstanding: Decimal) -> Decimal;
}

/// Standard policy: period income over outstanding balance
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCompliance;

impl ComplianceEvaluator for StandardCompliance {
    fn itd_of(&self, term: &CreditTerm, outstanding: Decimal) -> Decimal {
        if term.period_income.is_zero() {
            return Decimal::ZERO;
        }
        if outstanding.is_zero() {
            return ITD_INDETERMINATE;
        }
        term.period_income / outstanding
    }

    fn needed_income_of(&self, term: &CreditTerm, outstanding: Decimal) -> Decimal {
        if self.in_compliance(term, outstanding) {
            return Decimal::ZERO;
        }
        // Solves (income + x) / (outstanding - x) >= min_itd for the
        // smallest whole-unit x: incoming credits repay debt directly, so
        // the balance shrinks as income arrives, hence the min_itd + 1
        // denominator. The final unit rounds up to guarantee strict
        // sufficiency under truncation.
        let raw = (term.min_itd * outstanding - term.period_income)
            / (term.min_itd + Decimal::ONE);
        raw.floor() + Decimal::ONE
    }
}
