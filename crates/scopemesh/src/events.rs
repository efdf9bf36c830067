//! Events published by a [`MultiScopeArchitecture`](crate::MultiScopeArchitecture).
//!
//! Events are broadcast after the corresponding operation has succeeded.
//! Publishing never blocks; with no subscribers they are dropped.

use scopemesh_core::{PeerId, ScopeId};

/// A change observed by the architecture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeEvent {
    /// A scope was registered or replaced.
    ScopeRegistered {
        scope_id: ScopeId,
        parent_id: Option<ScopeId>,
    },
    /// A peer connected or reconnected.
    PeerConnected {
        peer_id: PeerId,
        scope_ids: Vec<ScopeId>,
    },
    /// A delta was merged and handed to the fan-out hook.
    StatePropagated {
        scope_id: ScopeId,
        keys: usize,
        recipients: usize,
    },
}

impl ScopeEvent {
    /// Scope the event concerns, if any
    pub fn scope_id(&self) -> Option<&ScopeId> {
        match self {
            ScopeEvent::ScopeRegistered { scope_id, .. }
            | ScopeEvent::StatePropagated { scope_id, .. } => Some(scope_id),
            ScopeEvent::PeerConnected { .. } => None,
        }
    }
}
