//! Keyed store of per-member credit periods
//!
//! Owned and mutated exclusively by the issuer. Absence of a record is the
//! uninitialized sentinel; records are removed only when a credit line
//! defaults.

use crate::types::CreditPeriod;
use credit_ledger::MemberId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Per-member period records
#[derive(Debug, Default)]
pub struct PeriodStore {
    periods: RwLock<HashMap<MemberId, CreditPeriod>>,
}

impl PeriodStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a member's period
    pub fn get(&self, member: &MemberId) -> Option<CreditPeriod> {
        self.periods.read().get(member).cloned()
    }

    /// Whether a period has been initialized for the member
    pub fn contains(&self, member: &MemberId) -> bool {
        self.periods.read().contains_key(member)
    }

    /// Insert or replace a member's period
    pub fn insert(&self, member: MemberId, period: CreditPeriod) {
        self.periods.write().insert(member, period);
    }

    /// Remove a member's period record
    pub fn remove(&self, member: &MemberId) -> Option<CreditPeriod> {
        self.periods.write().remove(member)
    }

    /// Mutate a member's period in place
    ///
    /// Returns `None` when the member is uninitialized.
    pub fn update<F, T>(&self, member: &MemberId, f: F) -> Option<T>
    where
        F: FnOnce(&mut CreditPeriod) -> T,
    {
        self.periods.write().get_mut(member).map(f)
    }

    /// Number of initialized periods
    pub fn len(&self) -> usize {
        self.periods.read().len()
    }

    /// Whether the store has no periods
    pub fn is_empty(&self) -> bool {
        self.periods.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample_period() -> CreditPeriod {
        let issued_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        CreditPeriod {
            issued_at,
            expiration: issued_at + Duration::days(90),
            grace_length: Duration::days(30),
            paused: false,
        }
    }

    #[test]
    fn test_absent_is_uninitialized() {
        let store = PeriodStore::new();
        let member = MemberId::new("alice");

        assert!(!store.contains(&member));
        assert!(store.get(&member).is_none());
        assert!(store.update(&member, |p| p.paused = true).is_none());
    }

    #[test]
    fn test_insert_update_remove() {
        let store = PeriodStore::new();
        let member = MemberId::new("alice");

        store.insert(member.clone(), sample_period());
        assert!(store.contains(&member));
        assert_eq!(store.len(), 1);

        store.update(&member, |p| p.paused = true);
        assert!(store.get(&member).unwrap().paused);

        store.remove(&member);
        assert!(store.is_empty());
    }
}
