//! Discovery index: key -> peers that declared it
//!
//! The index is append-only. Every connect appends the peer id to the
//! entry of each scope it declared, so reconnecting peers accumulate
//! duplicates and peers that later leave the directory linger as stale
//! ids. Readers mask both; [`DiscoveryIndex::compact`] removes them.

use std::collections::{HashMap, HashSet};

use scopemesh_core::{PeerId, ScopeId};

/// Map from scope id to the ordered peer ids indexed under it
#[derive(Debug, Clone, Default)]
pub struct DiscoveryIndex {
    entries: HashMap<ScopeId, Vec<PeerId>>,
}

impl DiscoveryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a peer id to a key's entry (no deduplication)
    pub fn append(&mut self, key: ScopeId, peer_id: PeerId) {
        self.entries.entry(key).or_default().push(peer_id);
    }

    /// Copy of the peer ids indexed under `key`, in append order.
    ///
    /// An unknown key yields an empty list.
    pub fn lookup(&self, key: &ScopeId) -> Vec<PeerId> {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    /// Borrow the raw entry for a key
    pub fn entry(&self, key: &ScopeId) -> &[PeerId] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of ids (duplicates included) stored under a key
    pub fn entry_len(&self, key: &ScopeId) -> usize {
        self.entries.get(key).map_or(0, Vec::len)
    }

    /// All keys that have an entry, sorted
    pub fn keys(&self) -> Vec<ScopeId> {
        let mut keys: Vec<_> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total ids stored across all entries
    pub fn total_len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Remove duplicate ids and ids for which `is_live` returns false.
    ///
    /// First occurrences keep their relative order. Entries left empty are
    /// dropped. Returns the number of ids removed.
    pub fn compact<F>(&mut self, is_live: F) -> usize
    where
        F: Fn(&PeerId) -> bool,
    {
        let mut removed = 0;

        self.entries.retain(|_, ids| {
            let before = ids.len();
            let mut seen: HashSet<PeerId> = HashSet::with_capacity(before);
            ids.retain(|id| is_live(id) && seen.insert(id.clone()));
            removed += before - ids.len();
            !ids.is_empty()
        });

        removed
    }
}
