//! Core types for credit periods and terms
//!
//! Amounts are whole base units of the network's credit token. Ratios
//! (fee rate, minimum income-to-debt) use the convention `1.0 == 100%`.

use chrono::{DateTime, Duration, Utc};
use credit_ledger::MemberId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ratio value denoting an indeterminate income-to-debt ratio
///
/// Returned when a member has no outstanding debt; always counts as a
/// valid ratio.
pub const ITD_INDETERMINATE: Decimal = Decimal::NEGATIVE_ONE;

/// Credit period timing for a member
///
/// A member is uninitialized until a period is first stored; absence from
/// the period store is the uninitialized sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPeriod {
    /// Timestamp the period was (re)started
    pub issued_at: DateTime<Utc>,

    /// Timestamp the active period ends
    pub expiration: DateTime<Utc>,

    /// Grace window following expiration
    #[serde(with = "duration_seconds")]
    pub grace_length: Duration,

    /// While set, expiration checks are suspended
    pub paused: bool,
}

impl CreditPeriod {
    /// Length of the active window
    pub fn period_length(&self) -> Duration {
        self.expiration - self.issued_at
    }

    /// End of the grace window
    pub fn grace_expiration(&self) -> DateTime<Utc> {
        self.expiration + self.grace_length
    }

    /// Status at the given instant
    pub fn status_at(&self, now: DateTime<Utc>) -> PeriodStatus {
        if self.paused {
            PeriodStatus::Paused
        } else if now < self.expiration {
            PeriodStatus::Active
        } else if now < self.grace_expiration() {
            PeriodStatus::Grace
        } else {
            PeriodStatus::Expired
        }
    }
}

/// Where a member sits on the Active → Grace → Expired progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodStatus {
    /// Before expiration; income accrues, outgoing transfers unrestricted
    Active,

    /// Past expiration, within the grace window; non-compliant members are
    /// frozen but repayments still land
    Grace,

    /// Past the grace window; renewal or default fires on the next touch
    Expired,

    /// Clock suspended; no transition fires until unpaused
    Paused,
}

/// Credit terms and per-period compliance counters for a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTerm {
    /// Fee fraction applied to transfers by the fee subsystem
    pub fee_rate: Decimal,

    /// Minimum required income-to-debt ratio
    pub min_itd: Decimal,

    /// Credits received during the current period
    pub period_income: Decimal,

    /// Income within the current period covered the entire outstanding
    /// balance at the time of receipt
    pub rebalanced: bool,
}

impl CreditTerm {
    /// Fresh terms at the start of a credit line
    pub fn new(fee_rate: Decimal, min_itd: Decimal) -> Self {
        Self {
            fee_rate,
            min_itd,
            period_income: Decimal::ZERO,
            rebalanced: false,
        }
    }

    /// Reset the per-period counters at renewal
    pub fn reset_period(&mut self) {
        self.period_income = Decimal::ZERO;
        self.rebalanced = false;
    }
}

/// Result of evaluating a member's period against the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// Period still running (or paused, or uninitialized); nothing applied
    Unchanged,

    /// Member was in compliance; period renewed for another cycle
    Renewed,

    /// Member was out of compliance; credit line defaulted
    Defaulted,
}

/// Authorization role for restricted issuer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May open credit lines and manage role grants
    Issuer,

    /// May pause periods and adjust terms
    Operator,
}

/// Observable notification emitted by the issuer
///
/// Default is a terminal business outcome, not an error; it is signaled
/// through these notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditEvent {
    /// Notification id
    pub event_id: Uuid,

    /// Member the notification concerns
    pub member: MemberId,

    /// What happened
    pub kind: CreditEventKind,

    /// Instant the notification was produced
    pub at: DateTime<Utc>,
}

/// Notification kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CreditEventKind {
    /// Credit line opened
    CreditLineInitialized {
        /// Limit granted
        limit: Decimal,
    },

    /// Period renewed for another cycle
    CreditPeriodRenewed {
        /// New expiration
        expiration: DateTime<Utc>,
    },

    /// Unpaid balance written off to network debt, limit zeroed
    CreditLineDefaulted {
        /// Amount written off
        written_off: Decimal,
    },

    /// Period clock suspended
    PeriodPaused,

    /// Period clock resumed
    PeriodUnpaused,

    /// Fee rate or minimum ITD changed
    TermsUpdated {
        /// Fee rate after the change
        fee_rate: Decimal,
        /// Minimum ITD after the change
        min_itd: Decimal,
    },

    /// Outgoing transfer of a frozen member skipped
    TransferDeferred {
        /// Amount that did not move
        amount: Decimal,
    },
}

mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::seconds(i64::deserialize(deserializer)?))
    }
}
