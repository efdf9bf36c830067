//! Fan-out hook
//!
//! After a delta has been merged into a scope, the architecture hands a
//! [`StateUpdate`] and the scope's discovered peers to a [`FanOut`]
//! implementation. The hook is called with no component lock held.

use std::sync::Arc;

use scopemesh_core::{FanOutError, Peer, StateUpdate};

/// Delivers merged state updates to peers
pub trait FanOut: Send + Sync {
    /// Hand `update` to every peer in `peers`.
    ///
    /// An error is reported to the caller's logs and stats only; the local
    /// merge has already happened and is never rolled back.
    fn fan_out(&self, update: &StateUpdate, peers: &[Peer]) -> Result<(), FanOutError>;
}

/// Fan-out that delivers nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFanOut;

impl FanOut for NoopFanOut {
    fn fan_out(&self, _update: &StateUpdate, _peers: &[Peer]) -> Result<(), FanOutError> {
        Ok(())
    }
}

impl<F: FanOut + ?Sized> FanOut for Arc<F> {
    fn fan_out(&self, update: &StateUpdate, peers: &[Peer]) -> Result<(), FanOutError> {
        (**self).fan_out(update, peers)
    }
}

impl<F: FanOut + ?Sized> FanOut for Box<F> {
    fn fan_out(&self, update: &StateUpdate, peers: &[Peer]) -> Result<(), FanOutError> {
        (**self).fan_out(update, peers)
    }
}
