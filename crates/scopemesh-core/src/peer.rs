//! Peer records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{PeerId, ScopeId};

/// A network participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Unique peer identifier
    pub id: PeerId,
    /// Opaque connection string (never parsed)
    pub address: String,
    /// Refreshed on every connect
    pub last_seen: DateTime<Utc>,
    /// Scopes this peer declared at connect time
    pub scope_ids: Vec<ScopeId>,
}

impl Peer {
    /// Create a peer that serves no scopes yet
    pub fn new(id: impl Into<PeerId>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            last_seen: DateTime::<Utc>::UNIX_EPOCH,
            scope_ids: Vec::new(),
        }
    }

    /// Declare the scopes this peer serves
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ScopeId>,
    {
        self.scope_ids = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Check whether this peer declared a scope
    pub fn serves(&self, scope_id: &ScopeId) -> bool {
        self.scope_ids.contains(scope_id)
    }
}
