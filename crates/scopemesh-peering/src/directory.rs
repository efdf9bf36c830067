//! Live peer directory
//!
//! Plain keyed container of [`Peer`] records. It has no lock of its own;
//! [`PeerNetwork`](crate::PeerNetwork) guards it together with the
//! discovery index.

use std::collections::HashMap;

use scopemesh_core::{Peer, PeerId};

/// Peers currently known to the network, keyed by id
#[derive(Debug, Clone, Default)]
pub struct PeerDirectory {
    peers: HashMap<PeerId, Peer>,
}

impl PeerDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a peer, returning the previous record
    pub fn upsert(&mut self, peer: Peer) -> Option<Peer> {
        self.peers.insert(peer.id.clone(), peer)
    }

    /// Look up a peer by id
    pub fn get(&self, id: &PeerId) -> Option<&Peer> {
        self.peers.get(id)
    }

    /// Check whether a peer is present
    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    /// Iterate over all peers (arbitrary order)
    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    /// Get the number of peers
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if the directory is empty
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
