//! In-memory reference ledger
//!
//! Backs the test suites and the demo simulator. Balances are signed: a
//! negative balance is outstanding credit (debt owed to the network), a
//! positive balance is credits held. Accounts materialize lazily on first
//! touch, the way any member of a mutual-credit network can hold credits
//! before being extended a line of their own.

use crate::{Error, LedgerService, MemberId, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;

/// Per-member account state
#[derive(Debug, Clone, Default)]
struct Account {
    /// Signed balance; negative is outstanding credit
    balance: Decimal,

    /// Credit limit (how far below zero the balance may go)
    limit: Decimal,
}

impl Account {
    /// Debt portion of the balance
    fn outstanding(&self) -> Decimal {
        if self.balance < Decimal::ZERO {
            -self.balance
        } else {
            Decimal::ZERO
        }
    }
}

/// In-memory mutual-credit ledger
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// Accounts by member
    accounts: DashMap<MemberId, Account>,

    /// Pooled network debt
    network_debt: RwLock<Decimal>,
}

impl InMemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Signed balance of a member (zero for untouched accounts)
    pub fn balance_of(&self, member: &MemberId) -> Decimal {
        self.accounts
            .get(member)
            .map(|a| a.balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Apply a validated transfer
    ///
    /// The caller is responsible for running the issuer's validation hook
    /// exactly once before invoking this; the ledger itself only enforces
    /// the sender's credit limit.
    pub fn apply_transfer(&self, from: &MemberId, to: &MemberId, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "transfer amount must be positive, got {}",
                amount
            )));
        }

        {
            let mut sender = self.accounts.entry(from.clone()).or_default();
            let new_balance = sender.balance - amount;
            if new_balance < -sender.limit {
                return Err(Error::LimitExceeded(format!(
                    "{} cannot extend {} past limit {}",
                    from, amount, sender.limit
                )));
            }
            sender.balance = new_balance;
        }

        let mut receiver = self.accounts.entry(to.clone()).or_default();
        receiver.balance += amount;

        tracing::debug!(%from, %to, %amount, "transfer applied");
        Ok(())
    }
}

impl LedgerService for InMemoryLedger {
    fn outstanding_balance(&self, member: &MemberId) -> Result<Decimal> {
        Ok(self
            .accounts
            .get(member)
            .map(|a| a.outstanding())
            .unwrap_or(Decimal::ZERO))
    }

    fn credit_limit(&self, member: &MemberId) -> Result<Decimal> {
        Ok(self
            .accounts
            .get(member)
            .map(|a| a.limit)
            .unwrap_or(Decimal::ZERO))
    }

    fn network_debt(&self) -> Result<Decimal> {
        Ok(*self.network_debt.read())
    }

    fn set_credit_limit(&self, member: &MemberId, amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "credit limit must be non-negative, got {}",
                amount
            )));
        }
        self.accounts.entry(member.clone()).or_default().limit = amount;
        Ok(())
    }

    fn create_credit_line(
        &self,
        member: &MemberId,
        limit: Decimal,
        initial_balance: Decimal,
    ) -> Result<()> {
        if limit < Decimal::ZERO || initial_balance < Decimal::ZERO {
            return Err(Error::InvalidAmount(
                "credit limit and initial balance must be non-negative".to_string(),
            ));
        }

        let mut account = self.accounts.entry(member.clone()).or_default();
        if account.limit > Decimal::ZERO {
            return Err(Error::CreditLineExists(member.to_string()));
        }

        account.limit = limit;
        if initial_balance > Decimal::ZERO {
            account.balance += initial_balance;
            *self.network_debt.write() += initial_balance;
        }

        tracing::info!(%member, %limit, %initial_balance, "credit line created");
        Ok(())
    }

    fn write_off_balance(&self, member: &MemberId) -> Result<Decimal> {
        let written_off = {
            let mut account = self.accounts.entry(member.clone()).or_default();
            let outstanding = account.outstanding();
            account.balance += outstanding;
            outstanding
        };

        if written_off > Decimal::ZERO {
            *self.network_debt.write() += written_off;
            tracing::warn!(%member, %written_off, "balance written off to network debt");
        }

        Ok(written_off)
    }
}
