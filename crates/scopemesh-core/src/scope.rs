//! Scope records
//!
//! A [`Scope`] is a named administrative domain. Scopes form a tree through
//! soft parent references: the parent id is stored as given and nothing
//! checks that it points at a registered scope.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{PeerId, ScopeId, ScopeKind};

/// Open key/value state carried by a scope
pub type StateMap = HashMap<String, serde_json::Value>;

/// A named administrative domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    /// Unique scope identifier
    pub id: ScopeId,
    /// Parent scope, `None` for a root
    pub parent_id: Option<ScopeId>,
    /// Classification tag (global, org, project, ...)
    pub kind: ScopeKind,
    /// Peers named when the scope was created.
    ///
    /// This is a static snapshot. Peers that connect later and declare this
    /// scope show up in the peer network's discovery index, not here.
    pub declared_peers: Vec<PeerId>,
    /// Mutable scope state
    #[serde(default)]
    pub state: StateMap,
    /// Set once at registration
    pub created_at: DateTime<Utc>,
    /// Refreshed on every state mutation
    pub updated_at: DateTime<Utc>,
}

impl Scope {
    /// Create an unregistered scope with empty state.
    ///
    /// Timestamps hold the Unix epoch until the registry stamps them.
    pub fn new(id: impl Into<ScopeId>, kind: impl Into<ScopeKind>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            kind: kind.into(),
            declared_peers: Vec::new(),
            state: StateMap::new(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Set the parent scope. An empty id means "no parent".
    pub fn with_parent(mut self, parent: impl Into<ScopeId>) -> Self {
        let parent = parent.into();
        self.parent_id = if parent.is_empty() { None } else { Some(parent) };
        self
    }

    /// Set the declared peer snapshot
    pub fn with_declared_peers<I, P>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PeerId>,
    {
        self.declared_peers = peers.into_iter().map(Into::into).collect();
        self
    }

    /// Seed the initial state
    pub fn with_state(mut self, state: StateMap) -> Self {
        self.state = state;
        self
    }

    /// Drop an empty parent id so the scope reads as a root.
    ///
    /// `with_parent` already does this; records built field by field or
    /// deserialized need it applied explicitly.
    pub fn normalize_parent(&mut self) {
        if self.parent_id.as_ref().is_some_and(ScopeId::is_empty) {
            self.parent_id = None;
        }
    }

    /// Check whether this scope is a root (has no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check whether this scope names `parent` as its parent
    pub fn is_child_of(&self, parent: &ScopeId) -> bool {
        self.parent_id.as_ref() == Some(parent)
    }

    /// Merge a delta into the state, overwriting per key
    pub fn merge_state(&mut self, delta: &StateMap) {
        for (key, value) in delta {
            self.state.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_creation() {
        let scope = Scope::new("org-1", ScopeKind::org())
            .with_parent("global")
            .with_declared_peers(["peer-1", "peer-2"]);

        assert_eq!(scope.id, ScopeId::from("org-1"));
        assert_eq!(scope.parent_id, Some(ScopeId::from("global")));
        assert_eq!(scope.kind.as_str(), "org");
        assert_eq!(scope.declared_peers.len(), 2);
        assert!(scope.state.is_empty());
        assert!(!scope.is_root());
        assert!(scope.is_child_of(&ScopeId::from("global")));
    }

    #[test]
    fn test_empty_parent_is_root() {
        let scope = Scope::new("global", ScopeKind::global()).with_parent("");
        assert!(scope.is_root());
    }

    #[test]
    fn test_normalize_parent_clears_empty_id() {
        let mut scope = Scope::new("global", ScopeKind::global());
        scope.parent_id = Some(ScopeId::from(""));
        assert!(!scope.is_root());

        scope.normalize_parent();
        assert!(scope.is_root());

        let mut child = Scope::new("org-1", ScopeKind::org()).with_parent("global");
        child.normalize_parent();
        assert_eq!(child.parent_id, Some(ScopeId::from("global")));
    }

    #[test]
    fn test_merge_state_overwrites_per_key() {
        let mut initial = StateMap::new();
        initial.insert("status".into(), json!("pending"));
        initial.insert("owner".into(), json!("alice"));
        let mut scope = Scope::new("project-1", ScopeKind::project()).with_state(initial);

        let mut delta = StateMap::new();
        delta.insert("status".into(), json!("active"));
        delta.insert("replicas".into(), json!(3));
        scope.merge_state(&delta);

        assert_eq!(scope.state["status"], json!("active"));
        assert_eq!(scope.state["owner"], json!("alice"));
        assert_eq!(scope.state["replicas"], json!(3));
    }
}
