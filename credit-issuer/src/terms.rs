//! Keyed store of per-member credit terms

use crate::types::CreditTerm;
use credit_ledger::MemberId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Per-member term records
#[derive(Debug, Default)]
pub struct TermStore {
    terms: RwLock<HashMap<MemberId, CreditTerm>>,
}

impl TermStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a member's terms
    pub fn get(&self, member: &MemberId) -> Option<CreditTerm> {
        self.terms.read().get(member).cloned()
    }

    /// Whether terms exist for the member
    pub fn contains(&self, member: &MemberId) -> bool {
        self.terms.read().contains_key(member)
    }

    /// Insert or replace a member's terms
    pub fn insert(&self, member: MemberId, term: CreditTerm) {
        self.terms.write().insert(member, term);
    }

    /// Mutate a member's terms in place
    ///
    /// Returns `None` when no terms exist for the member.
    pub fn update<F, T>(&self, member: &MemberId, f: F) -> Option<T>
    where
        F: FnOnce(&mut CreditTerm) -> T,
    {
        self.terms.write().get_mut(member).map(f)
    }
}
