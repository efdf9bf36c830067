//! The multi-scope architecture facade
//!
//! [`MultiScopeArchitecture`] composes a [`ScopeRegistry`], a
//! [`PeerNetwork`] and a [`FanOut`] hook. Each component guards its own
//! state; the facade never holds more than one component lock at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use scopemesh_core::{
    FanOutError, MeshError, Peer, Scope, ScopeId, SharedClock, StateMap, StateUpdate, SystemClock,
};
use scopemesh_peering::PeerNetwork;
use scopemesh_registry::ScopeRegistry;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::{ArchitectureConfig, ConfigError, FanOutConfig};
use crate::events::ScopeEvent;
use crate::fanout::{FanOut, NoopFanOut};
use crate::transport::{PeerTransport, RetryingFanOut};

/// Propagation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationStats {
    /// Successful `propagate_state` calls
    pub propagations: u64,
    /// Peers handed to the fan-out hook, summed over all propagations
    pub recipients: u64,
    /// Propagations whose fan-out hook returned an error
    pub fan_out_failures: u64,
}

#[derive(Debug, Default)]
struct PropagationCounters {
    propagations: AtomicU64,
    recipients: AtomicU64,
    fan_out_failures: AtomicU64,
}

/// Scope registry, peer network and state fan-out behind one handle.
///
/// `Send + Sync`; share it with `Arc`.
pub struct MultiScopeArchitecture {
    registry: ScopeRegistry,
    network: PeerNetwork,
    fan_out: Box<dyn FanOut>,
    events: broadcast::Sender<ScopeEvent>,
    counters: PropagationCounters,
    cancel: CancellationToken,
    config: ArchitectureConfig,
}

impl Default for MultiScopeArchitecture {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiScopeArchitecture {
    /// Create an architecture with default config, the system clock and no
    /// fan-out
    pub fn new() -> Self {
        assemble(
            ArchitectureConfig::default(),
            None,
            Box::new(NoopFanOut),
            CancellationToken::new(),
        )
    }

    pub fn builder() -> ArchitectureBuilder {
        ArchitectureBuilder::new()
    }

    pub fn config(&self) -> &ArchitectureConfig {
        &self.config
    }

    // ============================================================
    // Scopes
    // ============================================================

    /// Register a scope, replacing any scope with the same id
    #[instrument(skip(self, scope), fields(scope_id = %scope.id, kind = %scope.kind))]
    pub fn register_scope(&self, mut scope: Scope) -> Result<(), MeshError> {
        scope.normalize_parent();
        let scope_id = scope.id.clone();
        let parent_id = scope.parent_id.clone();

        self.registry.register(scope)?;

        let _ = self.events.send(ScopeEvent::ScopeRegistered {
            scope_id,
            parent_id,
        });
        Ok(())
    }

    /// Snapshot of a registered scope
    pub fn get_scope(&self, scope_id: &ScopeId) -> Result<Scope, MeshError> {
        Ok(self.registry.get(scope_id)?)
    }

    /// Merge `delta` into a scope's state, then hand it to the fan-out hook
    /// together with the scope's discovered peers.
    ///
    /// Fails only when the scope is unknown. A failing hook is logged and
    /// counted in [`stats`](Self::stats); the merge stands either way.
    #[instrument(skip(self, scope_id, delta), fields(scope_id = %scope_id, keys = delta.len()))]
    pub fn propagate_state(&self, scope_id: &ScopeId, delta: StateMap) -> Result<(), MeshError> {
        // Registry lock is taken and released inside propagate()
        let merged = self.registry.propagate(scope_id, &delta)?;

        let peers = self.network.discover(scope_id);
        let update = StateUpdate::new(scope_id.clone(), delta, merged.updated_at);

        self.counters.propagations.fetch_add(1, Ordering::Relaxed);
        self.counters
            .recipients
            .fetch_add(peers.len() as u64, Ordering::Relaxed);

        if let Err(e) = self.fan_out.fan_out(&update, &peers) {
            self.counters.fan_out_failures.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, recipients = peers.len(), "Fan-out failed, local state kept");
        } else {
            debug!(recipients = peers.len(), "State propagated");
        }

        let _ = self.events.send(ScopeEvent::StatePropagated {
            scope_id: scope_id.clone(),
            keys: update.key_count(),
            recipients: peers.len(),
        });
        Ok(())
    }

    /// Scopes whose parent is `scope_id`
    pub fn children(&self, scope_id: &ScopeId) -> Vec<Scope> {
        self.registry.children(scope_id)
    }

    /// Parent chain of a registered scope, nearest first
    pub fn ancestors(&self, scope_id: &ScopeId) -> Result<Vec<ScopeId>, MeshError> {
        Ok(self.registry.ancestors(scope_id)?)
    }

    /// Scopes with no parent
    pub fn roots(&self) -> Vec<Scope> {
        self.registry.roots()
    }

    /// Snapshot of every registered scope
    pub fn scopes(&self) -> Vec<Scope> {
        self.registry.scopes()
    }

    // ============================================================
    // Peers
    // ============================================================

    /// Connect a peer and index it under every scope it declares
    #[instrument(skip(self, peer), fields(peer_id = %peer.id.short(), scopes = peer.scope_ids.len()))]
    pub fn connect_peer(&self, peer: Peer) -> Result<(), MeshError> {
        let peer_id = peer.id.clone();
        let scope_ids = peer.scope_ids.clone();

        self.network.connect(peer)?;

        let _ = self.events.send(ScopeEvent::PeerConnected { peer_id, scope_ids });
        Ok(())
    }

    /// Live peers that declared `scope_id`, each listed once even when the
    /// discovery index holds repeated entries
    pub fn discover_peers(&self, scope_id: &ScopeId) -> Vec<Peer> {
        self.network.discover(scope_id)
    }

    /// Snapshot of every connected peer
    pub fn active_peers(&self) -> Vec<Peer> {
        self.network.active_peers()
    }

    /// Remove duplicate and stale ids from the discovery index
    pub fn compact_discovery_index(&self) -> usize {
        self.network.compact_index()
    }

    // ============================================================
    // Lifecycle
    // ============================================================

    /// Subscribe to scope, peer and propagation events
    pub fn subscribe(&self) -> broadcast::Receiver<ScopeEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> PropagationStats {
        PropagationStats {
            propagations: self.counters.propagations.load(Ordering::Relaxed),
            recipients: self.counters.recipients.load(Ordering::Relaxed),
            fan_out_failures: self.counters.fan_out_failures.load(Ordering::Relaxed),
        }
    }

    /// Token cancelled by [`shutdown`](Self::shutdown)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel in-flight fan-out deliveries.
    ///
    /// Local operations keep working; a cancellation-aware hook rejects
    /// further fan-outs, which then count as failures.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            info!("Shutting down fan-out");
            self.cancel.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Errors while building a [`MultiScopeArchitecture`]
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    FanOut(#[from] FanOutError),
}

/// Deferred construction of a transport-backed fan-out, run by `build()`
/// once the final config is known
type TransportFactory =
    Box<dyn FnOnce(FanOutConfig, CancellationToken) -> Result<Box<dyn FanOut>, FanOutError> + Send>;

enum PendingHook {
    Noop,
    Hook(Box<dyn FanOut>),
    Transport(TransportFactory),
}

/// Builder for a [`MultiScopeArchitecture`].
///
/// Setters may be called in any order; the config is validated and the
/// fan-out assembled in [`build`](Self::build).
pub struct ArchitectureBuilder {
    config: ArchitectureConfig,
    clock: Option<SharedClock>,
    hook: PendingHook,
    cancel: CancellationToken,
}

impl ArchitectureBuilder {
    pub fn new() -> Self {
        Self {
            config: ArchitectureConfig::default(),
            clock: None,
            hook: PendingHook::Noop,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a specific configuration
    pub fn config(mut self, config: ArchitectureConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom clock for scope and peer timestamps
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Install a fan-out hook, replacing any earlier hook or transport
    pub fn fan_out(mut self, fan_out: impl FanOut + 'static) -> Self {
        self.hook = PendingHook::Hook(Box::new(fan_out));
        self
    }

    /// Deliver updates through a [`RetryingFanOut`] over `transport`,
    /// replacing any earlier hook or transport.
    ///
    /// The retry policy is taken from the config in effect at
    /// [`build`](Self::build), which must run inside a tokio runtime.
    pub fn transport<T: PeerTransport>(mut self, transport: T) -> Self {
        self.hook = PendingHook::Transport(Box::new(move |config, cancel| {
            let fan_out = RetryingFanOut::new(transport, config, cancel)?;
            Ok(Box::new(fan_out) as Box<dyn FanOut>)
        }));
        self
    }

    /// Token the built architecture will cancel on shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Validate the config and assemble the architecture.
    ///
    /// Fails on an invalid config, or with [`FanOutError::NoRuntime`] when
    /// a transport was installed outside a tokio runtime.
    pub fn build(self) -> Result<MultiScopeArchitecture, BuildError> {
        self.config.validate()?;

        let fan_out: Box<dyn FanOut> = match self.hook {
            PendingHook::Noop => Box::new(NoopFanOut),
            PendingHook::Hook(hook) => hook,
            PendingHook::Transport(make) => make(self.config.fan_out.clone(), self.cancel.clone())?,
        };

        Ok(assemble(self.config, self.clock, fan_out, self.cancel))
    }
}

impl Default for ArchitectureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn assemble(
    config: ArchitectureConfig,
    clock: Option<SharedClock>,
    fan_out: Box<dyn FanOut>,
    cancel: CancellationToken,
) -> MultiScopeArchitecture {
    let clock = clock.unwrap_or_else(|| Arc::new(SystemClock));
    let (events, _) = broadcast::channel(config.event_channel_capacity);

    MultiScopeArchitecture {
        registry: ScopeRegistry::with_clock(Arc::clone(&clock)),
        network: PeerNetwork::with_clock(clock),
        fan_out,
        events,
        counters: PropagationCounters::default(),
        cancel,
        config,
    }
}
