//! # Scopemesh Peering
//!
//! Peer lifecycle and scope-based peer discovery.
//!
//! ## Core Components
//!
//! - [`PeerDirectory`]: live peers keyed by id, each with a last-seen stamp
//! - [`DiscoveryIndex`]: append-only map from scope id to declaring peer ids
//! - [`PeerNetwork`]: both of the above behind a single reader/writer lock
//!
//! A peer declares the scopes it serves when it connects. Those
//! declarations feed the discovery index, and [`PeerNetwork::discover`]
//! resolves an index entry against the live directory. The index is keyed
//! independently of any scope registry, so discovering an unregistered
//! scope is valid and simply yields whatever peers declared it.

pub mod directory;
pub mod index;
pub mod network;

// Re-export main types
pub use directory::PeerDirectory;
pub use index::DiscoveryIndex;
pub use network::PeerNetwork;
