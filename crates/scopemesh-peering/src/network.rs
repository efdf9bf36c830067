//! Peer network: directory + discovery index under one lock
//!
//! [`PeerNetwork`] owns the peer lifecycle. A connect updates the directory
//! and the index inside the same write-lock critical section, so a reader
//! never sees a peer indexed under a scope before its directory record
//! exists.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use scopemesh_core::{Clock, Peer, PeerError, PeerId, ScopeId, SharedClock, SystemClock};
use tracing::{debug, trace};

use crate::directory::PeerDirectory;
use crate::index::DiscoveryIndex;

/// State guarded by the network lock
#[derive(Debug, Default)]
struct NetworkState {
    directory: PeerDirectory,
    index: DiscoveryIndex,
}

/// Peer lifecycle and scope -> peer resolution
pub struct PeerNetwork {
    state: RwLock<NetworkState>,
    clock: SharedClock,
}

impl Default for PeerNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerNetwork {
    /// Create an empty network using the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty network with a custom clock
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            state: RwLock::new(NetworkState::default()),
            clock,
        }
    }

    /// Connect a peer, replacing any previous record with the same id.
    ///
    /// Refreshes `last_seen` and appends the peer id to the discovery entry
    /// of every scope it declares.
    pub fn connect(&self, mut peer: Peer) -> Result<(), PeerError> {
        if peer.id.is_empty() {
            return Err(PeerError::InvalidInput("peer ID is empty".to_string()));
        }

        let mut state = self.state.write();

        peer.last_seen = self.clock.now_utc();
        for scope_id in &peer.scope_ids {
            state.index.append(scope_id.clone(), peer.id.clone());
        }

        let peer_id = peer.id.clone();
        let scope_count = peer.scope_ids.len();
        if state.directory.upsert(peer).is_some() {
            debug!(peer = %peer_id.short(), scopes = scope_count, "Peer reconnected");
        } else {
            trace!(peer = %peer_id.short(), scopes = scope_count, "Peer connected");
        }

        Ok(())
    }

    /// Live peers indexed under a scope.
    ///
    /// Ids that are no longer in the directory are skipped, and a peer
    /// indexed several times is returned once, at its first position.
    /// The index itself keeps every append, so after a reconnect this list
    /// can be shorter than [`index_entry_len`](Self::index_entry_len) until
    /// [`compact_index`](Self::compact_index) runs.
    ///
    /// The scope does not need to be registered anywhere; an unknown key
    /// yields an empty list.
    pub fn discover(&self, scope_id: &ScopeId) -> Vec<Peer> {
        let state = self.state.read();

        let entry = state.index.entry(scope_id);
        let mut seen: HashSet<&PeerId> = HashSet::with_capacity(entry.len());
        entry
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| state.directory.get(id).cloned())
            .collect()
    }

    /// Snapshot of all connected peers
    pub fn active_peers(&self) -> Vec<Peer> {
        self.state.read().directory.peers().cloned().collect()
    }

    /// Look up a single peer
    pub fn peer(&self, id: &PeerId) -> Option<Peer> {
        self.state.read().directory.get(id).cloned()
    }

    /// Get the number of connected peers
    pub fn peer_count(&self) -> usize {
        self.state.read().directory.len()
    }

    /// Number of raw index ids stored under a scope, duplicates and stale
    /// ids included
    pub fn index_entry_len(&self, scope_id: &ScopeId) -> usize {
        self.state.read().index.entry_len(scope_id)
    }

    /// Drop duplicate and stale ids from the discovery index.
    ///
    /// Does not change what [`discover`](Self::discover) returns. Returns
    /// the number of ids removed.
    pub fn compact_index(&self) -> usize {
        let mut state = self.state.write();
        let NetworkState { directory, index } = &mut *state;

        let removed = index.compact(|id| directory.contains(id));
        if removed > 0 {
            debug!(removed, "Compacted discovery index");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use scopemesh_core::ManualClock;

    fn scope(s: &str) -> ScopeId {
        ScopeId::from(s)
    }

    fn ids(peers: &[Peer]) -> Vec<&str> {
        peers.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_connect_and_active_peers() {
        let network = PeerNetwork::new();
        network
            .connect(Peer::new("peer-1", "addr1").with_scopes(["org-1"]))
            .unwrap();
        network
            .connect(Peer::new("peer-2", "addr2").with_scopes(["project-1"]))
            .unwrap();

        assert_eq!(network.active_peers().len(), 2);
        assert_eq!(network.peer_count(), 2);
    }

    #[test]
    fn test_connect_empty_id_rejected() {
        let network = PeerNetwork::new();
        let err = network
            .connect(Peer::new("", "addr").with_scopes(["org-1"]))
            .unwrap_err();

        assert!(matches!(err, PeerError::InvalidInput(_)));
        assert!(network.active_peers().is_empty());
        assert_eq!(network.index_entry_len(&scope("org-1")), 0);
    }

    #[test]
    fn test_reconnect_is_idempotent_on_id() {
        let clock = ManualClock::new(DateTime::<Utc>::UNIX_EPOCH + Duration::days(1));
        let network = PeerNetwork::with_clock(Arc::new(clock.clone()));

        network.connect(Peer::new("peer-1", "old-addr")).unwrap();
        let first = network.peer(&PeerId::from("peer-1")).unwrap();

        clock.advance(Duration::seconds(30));
        network.connect(Peer::new("peer-1", "new-addr")).unwrap();
        let second = network.peer(&PeerId::from("peer-1")).unwrap();

        assert_eq!(network.peer_count(), 1);
        assert_eq!(second.address, "new-addr");
        assert_eq!(second.last_seen - first.last_seen, Duration::seconds(30));
    }

    #[test]
    fn test_discover_returns_declaring_peers() {
        let network = PeerNetwork::new();
        network
            .connect(Peer::new("peer-1", "a").with_scopes(["org-1"]))
            .unwrap();
        network
            .connect(Peer::new("peer-2", "b").with_scopes(["org-1", "project-1"]))
            .unwrap();
        network
            .connect(Peer::new("peer-3", "c").with_scopes(["project-1"]))
            .unwrap();

        let found = network.discover(&scope("org-1"));
        assert_eq!(found.len(), 2);
        assert_eq!(ids(&found), vec!["peer-1", "peer-2"]);
    }

    #[test]
    fn test_discover_unknown_scope_is_empty() {
        let network = PeerNetwork::new();
        network
            .connect(Peer::new("peer-1", "a").with_scopes(["org-1"]))
            .unwrap();

        assert!(network.discover(&scope("never-declared")).is_empty());
    }

    #[test]
    fn test_discover_masks_duplicate_entries() {
        let network = PeerNetwork::new();
        network
            .connect(Peer::new("peer-1", "a").with_scopes(["org-1"]))
            .unwrap();
        network
            .connect(Peer::new("peer-1", "a").with_scopes(["org-1"]))
            .unwrap();

        assert_eq!(network.index_entry_len(&scope("org-1")), 2);
        assert_eq!(ids(&network.discover(&scope("org-1"))), vec!["peer-1"]);
    }

    #[test]
    fn test_reconnect_keeps_old_scope_entries() {
        let network = PeerNetwork::new();
        network
            .connect(Peer::new("peer-1", "a").with_scopes(["org-1"]))
            .unwrap();
        network
            .connect(Peer::new("peer-1", "a").with_scopes(["org-2"]))
            .unwrap();

        // The index never forgets a declaration; the peer is still live
        assert_eq!(ids(&network.discover(&scope("org-1"))), vec!["peer-1"]);
        assert_eq!(ids(&network.discover(&scope("org-2"))), vec!["peer-1"]);
    }

    #[test]
    fn test_compact_index_keeps_discover_results() {
        let network = PeerNetwork::new();
        for _ in 0..3 {
            network
                .connect(Peer::new("peer-1", "a").with_scopes(["org-1"]))
                .unwrap();
        }
        network
            .connect(Peer::new("peer-2", "b").with_scopes(["org-1"]))
            .unwrap();

        let before = ids(&network.discover(&scope("org-1")))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let removed = network.compact_index();

        assert_eq!(removed, 2);
        assert_eq!(network.index_entry_len(&scope("org-1")), 2);
        assert_eq!(ids(&network.discover(&scope("org-1"))), before);
        assert_eq!(network.compact_index(), 0);
    }
}
