//! State updates handed to the fan-out hook

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ScopeId;
use crate::scope::StateMap;

/// A delta that has been merged locally and is ready to be sent to peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Scope the delta was applied to
    pub scope_id: ScopeId,
    /// Only the keys that changed
    pub delta: StateMap,
    /// The scope's `updated_at` after the merge
    pub updated_at: DateTime<Utc>,
}

impl StateUpdate {
    pub fn new(scope_id: ScopeId, delta: StateMap, updated_at: DateTime<Utc>) -> Self {
        Self {
            scope_id,
            delta,
            updated_at,
        }
    }

    /// Number of keys carried by this update
    pub fn key_count(&self) -> usize {
        self.delta.len()
    }
}
