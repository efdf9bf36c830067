//! Async peer transport and the retrying fan-out built on it
//!
//! [`RetryingFanOut`] turns the synchronous [`FanOut`] hook into one tokio
//! task per recipient. Each task sends through a [`PeerTransport`], backing
//! off exponentially between failed attempts, and gives up early when the
//! shared [`CancellationToken`] fires. `fan_out` itself returns as soon as
//! the tasks are spawned.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use scopemesh_core::{FanOutError, Peer, StateUpdate};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::FanOutConfig;
use crate::fanout::FanOut;

/// Sends a single state update to a single peer
#[async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    async fn send(&self, peer: &Peer, update: &StateUpdate) -> Result<(), FanOutError>;
}

/// Outcome counters for a [`RetryingFanOut`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Deliveries that eventually succeeded
    pub delivered: u64,
    /// Deliveries that ran out of attempts
    pub failed: u64,
    /// Deliveries abandoned because of cancellation
    pub cancelled: u64,
    /// Send attempts after the first, across all deliveries
    pub retries: u64,
}

#[derive(Debug, Default)]
struct DeliveryCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    retries: AtomicU64,
}

impl DeliveryCounters {
    fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// Best-effort fan-out over a [`PeerTransport`]
pub struct RetryingFanOut<T> {
    transport: Arc<T>,
    config: FanOutConfig,
    handle: Handle,
    cancel: CancellationToken,
    counters: Arc<DeliveryCounters>,
}

impl<T: PeerTransport> RetryingFanOut<T> {
    /// Create a fan-out bound to the current tokio runtime.
    ///
    /// Fails with [`FanOutError::NoRuntime`] outside a runtime context.
    pub fn new(
        transport: T,
        config: FanOutConfig,
        cancel: CancellationToken,
    ) -> Result<Self, FanOutError> {
        let handle = Handle::try_current().map_err(|_| FanOutError::NoRuntime)?;
        Ok(Self::with_handle(transport, config, cancel, handle))
    }

    /// Create a fan-out that spawns onto an explicit runtime
    pub fn with_handle(
        transport: T,
        config: FanOutConfig,
        cancel: CancellationToken,
        handle: Handle,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            handle,
            cancel,
            counters: Arc::new(DeliveryCounters::default()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &FanOutConfig {
        &self.config
    }

    /// Snapshot of delivery outcomes so far
    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }
}

impl<T: PeerTransport> FanOut for RetryingFanOut<T> {
    fn fan_out(&self, update: &StateUpdate, peers: &[Peer]) -> Result<(), FanOutError> {
        if self.cancel.is_cancelled() {
            return Err(FanOutError::Cancelled);
        }
        if peers.is_empty() {
            return Ok(());
        }

        let update = Arc::new(update.clone());
        for peer in peers {
            let delivery = Delivery {
                transport: Arc::clone(&self.transport),
                peer: peer.clone(),
                update: Arc::clone(&update),
                config: self.config.clone(),
                cancel: self.cancel.clone(),
                counters: Arc::clone(&self.counters),
            };
            self.handle.spawn(delivery.run());
        }

        trace!(scope = %update.scope_id, peers = peers.len(), "Spawned deliveries");
        Ok(())
    }
}

/// One update on its way to one peer
struct Delivery<T> {
    transport: Arc<T>,
    peer: Peer,
    update: Arc<StateUpdate>,
    config: FanOutConfig,
    cancel: CancellationToken,
    counters: Arc<DeliveryCounters>,
}

impl<T: PeerTransport> Delivery<T> {
    async fn run(self) {
        let outcome = self.attempt_all().await;
        let peer = self.peer.id.short();
        let scope = &self.update.scope_id;

        match outcome {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                trace!(%peer, %scope, "Update delivered");
            }
            Err(FanOutError::Cancelled) => {
                self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(%peer, %scope, "Delivery cancelled");
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(%peer, %scope, error = %e, "Delivery failed, giving up");
            }
        }
    }

    async fn attempt_all(&self) -> Result<(), FanOutError> {
        let mut failures = 0u32;
        loop {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return Err(FanOutError::Cancelled),
                result = self.transport.send(&self.peer, &self.update) => result,
            };

            let err = match result {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            failures += 1;
            if failures >= self.config.max_attempts {
                return Err(err);
            }

            let delay = self.config.backoff_for(failures);
            debug!(
                peer = %self.peer.id.short(),
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Send failed, backing off"
            );

            if !backoff(delay, &self.cancel).await {
                return Err(FanOutError::Cancelled);
            }
            self.counters.retries.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Sleep for `delay` unless cancelled first.
///
/// Returns `true` to keep retrying, `false` when cancelled.
async fn backoff(delay: std::time::Duration, cancel: &CancellationToken) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    tokio::select! {
        _ = &mut sleep => true,
        _ = cancel.cancelled() => false,
    }
}
