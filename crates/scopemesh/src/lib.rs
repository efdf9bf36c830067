//! # Scopemesh
//!
//! A hierarchical scope registry with peer discovery and state propagation.
//!
//! Scopes are named administrative domains arranged in a tree by soft parent
//! references. Peers declare the scopes they serve when they connect, and a
//! state delta propagated into a scope is merged locally and then handed to
//! a pluggable fan-out hook along with that scope's peers.
//!
//! ## Quick Start
//!
//! ```
//! use scopemesh::prelude::*;
//! use serde_json::json;
//!
//! let arch = MultiScopeArchitecture::new();
//!
//! arch.register_scope(Scope::new("global", ScopeKind::global()))?;
//! arch.register_scope(Scope::new("org-1", ScopeKind::org()).with_parent("global"))?;
//! arch.connect_peer(Peer::new("peer-1", "10.0.0.1:7000").with_scopes(["org-1"]))?;
//!
//! let mut delta = StateMap::new();
//! delta.insert("status".to_string(), json!("active"));
//! arch.propagate_state(&ScopeId::from("org-1"), delta)?;
//!
//! assert_eq!(arch.discover_peers(&ScopeId::from("org-1")).len(), 1);
//! # Ok::<(), MeshError>(())
//! ```
//!
//! ## Fan-out
//!
//! The default hook, [`NoopFanOut`], delivers nothing. Install a
//! [`RetryingFanOut`] over your own [`PeerTransport`] with
//! [`ArchitectureBuilder::transport`] to send updates from tokio tasks with
//! capped exponential backoff.

pub mod architecture;
pub mod config;
pub mod events;
pub mod fanout;
pub mod transport;

pub use architecture::{ArchitectureBuilder, BuildError, MultiScopeArchitecture, PropagationStats};
pub use config::{ArchitectureConfig, ConfigError, FanOutConfig};
pub use events::ScopeEvent;
pub use fanout::{FanOut, NoopFanOut};
pub use transport::{DeliveryStats, PeerTransport, RetryingFanOut};

// Re-export the record and error types callers need
pub use scopemesh_core::{
    Clock, ErrorKind, FanOutError, ManualClock, MeshError, MeshResult, Peer, PeerError, PeerId,
    Scope, ScopeError, ScopeId, ScopeKind, SharedClock, StateMap, StateUpdate, SystemClock,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ArchitectureBuilder, ArchitectureConfig, FanOut, MeshError, MultiScopeArchitecture,
        NoopFanOut, Peer, PeerId, PeerTransport, Scope, ScopeEvent, ScopeId, ScopeKind, StateMap,
        StateUpdate,
    };
}
