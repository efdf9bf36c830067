//! In-memory scope registry
//!
//! The [`ScopeRegistry`] owns every [`Scope`] record, keyed by id, behind a
//! single reader/writer lock. Reads share the lock; registration and state
//! propagation take it exclusively. Callers always get owned snapshots, so
//! the registry stays the only writer of timestamps.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use scopemesh_core::{Clock, Scope, ScopeError, ScopeId, SharedClock, StateMap, SystemClock};
use tracing::{debug, trace};

/// Keyed store of scope records
pub struct ScopeRegistry {
    /// Scopes indexed by id
    scopes: RwLock<HashMap<ScopeId, Scope>>,
    /// Timestamp source
    clock: SharedClock,
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeRegistry {
    /// Create an empty registry using the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty registry with a custom clock
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            scopes: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Register a scope, replacing any existing scope with the same id.
    ///
    /// Both timestamps are set from a single clock read, and an empty parent
    /// id is stored as no parent. Callers that need create-only semantics
    /// should check [`contains`](Self::contains) first.
    pub fn register(&self, mut scope: Scope) -> Result<(), ScopeError> {
        if scope.id.is_empty() {
            return Err(ScopeError::InvalidInput("scope ID is empty".to_string()));
        }
        scope.normalize_parent();

        let mut scopes = self.scopes.write();

        let now = self.clock.now_utc();
        scope.created_at = now;
        scope.updated_at = now;

        let id = scope.id.clone();
        if scopes.insert(id.clone(), scope).is_some() {
            debug!(scope = %id, "Replaced existing scope");
        } else {
            trace!(scope = %id, "Registered scope");
        }

        Ok(())
    }

    /// Get a snapshot of a scope
    pub fn get(&self, id: &ScopeId) -> Result<Scope, ScopeError> {
        self.scopes
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ScopeError::NotFound(id.clone()))
    }

    /// Merge a delta into a scope's state and return the merged snapshot.
    ///
    /// Keys absent from `delta` are untouched. `updated_at` always moves
    /// forward, even if the clock reads the same instant twice or steps back.
    pub fn propagate(&self, id: &ScopeId, delta: &StateMap) -> Result<Scope, ScopeError> {
        let mut scopes = self.scopes.write();

        let scope = scopes
            .get_mut(id)
            .ok_or_else(|| ScopeError::NotFound(id.clone()))?;

        scope.merge_state(delta);
        scope.updated_at = next_timestamp(scope.updated_at, self.clock.now_utc());

        trace!(scope = %id, keys = delta.len(), "Merged state delta");
        Ok(scope.clone())
    }

    /// Check whether a scope is registered
    pub fn contains(&self, id: &ScopeId) -> bool {
        self.scopes.read().contains_key(id)
    }

    /// Get the number of registered scopes
    pub fn len(&self) -> usize {
        self.scopes.read().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.scopes.read().is_empty()
    }

    /// Snapshot of all scopes, ordered by id
    pub fn scopes(&self) -> Vec<Scope> {
        let mut all: Vec<_> = self.scopes.read().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// All registered scope ids, sorted
    pub fn scope_ids(&self) -> Vec<ScopeId> {
        let mut ids: Vec<_> = self.scopes.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Scopes that have no parent, ordered by id
    pub fn roots(&self) -> Vec<Scope> {
        let mut roots: Vec<_> = self
            .scopes
            .read()
            .values()
            .filter(|scope| scope.is_root())
            .cloned()
            .collect();
        roots.sort_by(|a, b| a.id.cmp(&b.id));
        roots
    }

    /// Scopes that name `parent` as their parent, ordered by id.
    ///
    /// `parent` itself does not have to be registered.
    pub fn children(&self, parent: &ScopeId) -> Vec<Scope> {
        let mut children: Vec<_> = self
            .scopes
            .read()
            .values()
            .filter(|scope| scope.is_child_of(parent))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.id.cmp(&b.id));
        children
    }

    /// Walk parent links upward, nearest ancestor first.
    ///
    /// The walk stops at a root, at a parent id that is not registered
    /// (that id is still reported), or when a cycle is detected.
    pub fn ancestors(&self, id: &ScopeId) -> Result<Vec<ScopeId>, ScopeError> {
        let scopes = self.scopes.read();

        let start = scopes
            .get(id)
            .ok_or_else(|| ScopeError::NotFound(id.clone()))?;

        let mut ancestors = Vec::new();
        let mut visited: HashSet<&ScopeId> = HashSet::new();
        visited.insert(&start.id);

        let mut next = start.parent_id.as_ref();
        while let Some(parent_id) = next {
            if !visited.insert(parent_id) {
                debug!(scope = %id, at = %parent_id, "Cycle in scope hierarchy");
                break;
            }
            ancestors.push(parent_id.clone());
            next = scopes.get(parent_id).and_then(|p| p.parent_id.as_ref());
        }

        Ok(ancestors)
    }
}

/// Pick the next `updated_at`, strictly after `previous`
fn next_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::nanoseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopemesh_core::{ManualClock, ScopeKind};
    use serde_json::json;

    fn id(s: &str) -> ScopeId {
        ScopeId::from(s)
    }

    fn delta(pairs: &[(&str, serde_json::Value)]) -> StateMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn manual_registry() -> (ScopeRegistry, ManualClock) {
        let clock = ManualClock::new(DateTime::<Utc>::UNIX_EPOCH + Duration::days(365));
        let registry = ScopeRegistry::with_clock(Arc::new(clock.clone()));
        (registry, clock)
    }

    #[test]
    fn test_register_and_get() {
        let registry = ScopeRegistry::new();
        registry
            .register(Scope::new("global", ScopeKind::global()))
            .unwrap();

        let scope = registry.get(&id("global")).unwrap();
        assert_eq!(scope.id, id("global"));
        assert!(scope.state.is_empty());
        assert_eq!(scope.created_at, scope.updated_at);
        assert!(scope.created_at > DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_register_empty_id_rejected() {
        let registry = ScopeRegistry::new();
        let err = registry.register(Scope::new("", ScopeKind::org())).unwrap_err();

        assert!(matches!(err, ScopeError::InvalidInput(_)));
        assert!(registry.is_empty());
        assert!(!registry.contains(&id("")));
    }

    #[test]
    fn test_register_treats_empty_parent_as_root() {
        let registry = ScopeRegistry::new();

        let global: Scope = serde_json::from_value(json!({
            "id": "global",
            "parent_id": "",
            "kind": "global",
            "declared_peers": [],
            "state": {},
            "created_at": "1970-01-01T00:00:00Z",
            "updated_at": "1970-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(global.parent_id, Some(id("")));
        registry.register(global).unwrap();

        let mut org = Scope::new("org-1", ScopeKind::org());
        org.parent_id = Some(id(""));
        registry.register(org).unwrap();

        assert!(registry.get(&id("global")).unwrap().is_root());
        let roots: Vec<_> = registry.roots().into_iter().map(|s| s.id).collect();
        assert_eq!(roots, vec![id("global"), id("org-1")]);
        assert!(registry.ancestors(&id("org-1")).unwrap().is_empty());
        assert!(registry.children(&id("")).is_empty());
    }

    #[test]
    fn test_register_overwrites() {
        let (registry, clock) = manual_registry();
        registry
            .register(Scope::new("org-1", ScopeKind::org()).with_parent("global"))
            .unwrap();
        let first = registry.get(&id("org-1")).unwrap();

        clock.advance(Duration::seconds(10));
        registry
            .register(Scope::new("org-1", ScopeKind::project()))
            .unwrap();
        let second = registry.get(&id("org-1")).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(second.kind, ScopeKind::project());
        assert!(second.parent_id.is_none());
        assert!(second.created_at > first.created_at);
    }

    #[test]
    fn test_register_keeps_seeded_state() {
        let registry = ScopeRegistry::new();
        let seeded = delta(&[("tier", json!("gold"))]);
        registry
            .register(Scope::new("org-1", ScopeKind::org()).with_state(seeded))
            .unwrap();

        let scope = registry.get(&id("org-1")).unwrap();
        assert_eq!(scope.state["tier"], json!("gold"));
    }

    #[test]
    fn test_get_missing() {
        let registry = ScopeRegistry::new();
        let err = registry.get(&id("missing")).unwrap_err();
        assert_eq!(err, ScopeError::NotFound(id("missing")));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_propagate_merges_and_refreshes() {
        let (registry, clock) = manual_registry();
        registry
            .register(
                Scope::new("org-1", ScopeKind::org())
                    .with_state(delta(&[("owner", json!("alice")), ("status", json!("new"))])),
            )
            .unwrap();
        let before = registry.get(&id("org-1")).unwrap();

        clock.advance(Duration::milliseconds(5));
        let merged = registry
            .propagate(&id("org-1"), &delta(&[("status", json!("active"))]))
            .unwrap();

        assert_eq!(merged.state["status"], json!("active"));
        assert_eq!(merged.state["owner"], json!("alice"));
        assert!(merged.updated_at > before.updated_at);
        assert_eq!(merged.created_at, before.created_at);
        assert_eq!(registry.get(&id("org-1")).unwrap(), merged);
    }

    #[test]
    fn test_propagate_is_strictly_monotonic_on_frozen_clock() {
        let (registry, _clock) = manual_registry();
        registry
            .register(Scope::new("org-1", ScopeKind::org()))
            .unwrap();
        let registered = registry.get(&id("org-1")).unwrap();

        let first = registry
            .propagate(&id("org-1"), &delta(&[("a", json!(1))]))
            .unwrap();
        let second = registry
            .propagate(&id("org-1"), &delta(&[("a", json!(2))]))
            .unwrap();

        assert!(first.updated_at > registered.updated_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[test]
    fn test_propagate_survives_clock_going_backwards() {
        let (registry, clock) = manual_registry();
        registry
            .register(Scope::new("org-1", ScopeKind::org()))
            .unwrap();
        let registered = registry.get(&id("org-1")).unwrap();

        clock.advance(Duration::hours(-1));
        let merged = registry
            .propagate(&id("org-1"), &delta(&[("a", json!(1))]))
            .unwrap();
        assert!(merged.updated_at > registered.updated_at);
    }

    #[test]
    fn test_propagate_missing_does_not_create() {
        let registry = ScopeRegistry::new();
        let err = registry
            .propagate(&id("missing"), &delta(&[("status", json!("active"))]))
            .unwrap_err();

        assert!(matches!(err, ScopeError::NotFound(_)));
        assert!(!registry.contains(&id("missing")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_roots_and_children() {
        let registry = ScopeRegistry::new();
        registry.register(Scope::new("global", ScopeKind::global())).unwrap();
        registry
            .register(Scope::new("org-2", ScopeKind::org()).with_parent("global"))
            .unwrap();
        registry
            .register(Scope::new("org-1", ScopeKind::org()).with_parent("global"))
            .unwrap();
        registry
            .register(Scope::new("project-1", ScopeKind::project()).with_parent("org-1"))
            .unwrap();

        let roots: Vec<_> = registry.roots().into_iter().map(|s| s.id).collect();
        assert_eq!(roots, vec![id("global")]);

        let children: Vec<_> = registry
            .children(&id("global"))
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(children, vec![id("org-1"), id("org-2")]);

        assert!(registry.children(&id("project-1")).is_empty());
        assert_eq!(registry.scope_ids().len(), 4);
    }

    #[test]
    fn test_children_of_unregistered_parent() {
        let registry = ScopeRegistry::new();
        registry
            .register(Scope::new("orphan", ScopeKind::project()).with_parent("ghost"))
            .unwrap();

        let children = registry.children(&id("ghost"));
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, id("orphan"));
    }

    #[test]
    fn test_ancestors() {
        let registry = ScopeRegistry::new();
        registry.register(Scope::new("global", ScopeKind::global())).unwrap();
        registry
            .register(Scope::new("org-1", ScopeKind::org()).with_parent("global"))
            .unwrap();
        registry
            .register(Scope::new("project-1", ScopeKind::project()).with_parent("org-1"))
            .unwrap();

        assert_eq!(
            registry.ancestors(&id("project-1")).unwrap(),
            vec![id("org-1"), id("global")]
        );
        assert!(registry.ancestors(&id("global")).unwrap().is_empty());
        assert!(matches!(
            registry.ancestors(&id("missing")),
            Err(ScopeError::NotFound(_))
        ));
    }

    #[test]
    fn test_ancestors_dangling_parent() {
        let registry = ScopeRegistry::new();
        registry
            .register(Scope::new("project-1", ScopeKind::project()).with_parent("org-x"))
            .unwrap();

        assert_eq!(registry.ancestors(&id("project-1")).unwrap(), vec![id("org-x")]);
    }

    #[test]
    fn test_ancestors_cycle_terminates() {
        let registry = ScopeRegistry::new();
        registry
            .register(Scope::new("a", ScopeKind::org()).with_parent("b"))
            .unwrap();
        registry
            .register(Scope::new("b", ScopeKind::org()).with_parent("a"))
            .unwrap();

        assert_eq!(registry.ancestors(&id("a")).unwrap(), vec![id("b")]);

        registry
            .register(Scope::new("self", ScopeKind::org()).with_parent("self"))
            .unwrap();
        assert!(registry.ancestors(&id("self")).unwrap().is_empty());
    }

    #[test]
    fn test_next_timestamp() {
        let t = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(10);
        assert_eq!(next_timestamp(t, t + Duration::seconds(1)), t + Duration::seconds(1));
        assert_eq!(next_timestamp(t, t), t + Duration::nanoseconds(1));
    }
}
