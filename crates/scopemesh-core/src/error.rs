//! Error types for scopemesh

use thiserror::Error;

use crate::id::ScopeId;

/// Top-level error type for scopemesh
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),

    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),

    #[error("Fan-out error: {0}")]
    FanOut(#[from] FanOutError),
}

/// Coarse classification of a [`MeshError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required identifier was empty
    InvalidInput,
    /// A lookup or update named an unknown record
    NotFound,
    /// The fan-out hook failed
    FanOut,
}

impl MeshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::Scope(ScopeError::InvalidInput(_)) => ErrorKind::InvalidInput,
            MeshError::Scope(ScopeError::NotFound(_)) => ErrorKind::NotFound,
            MeshError::Peer(PeerError::InvalidInput(_)) => ErrorKind::InvalidInput,
            MeshError::FanOut(_) => ErrorKind::FanOut,
        }
    }
}

/// Errors raised by the scope registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Scope {0} not found")]
    NotFound(ScopeId),
}

/// Errors raised by the peer network
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors raised by fan-out hooks and peer transports
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FanOutError {
    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Fan-out cancelled")]
    Cancelled,

    #[error("No async runtime available for fan-out")]
    NoRuntime,
}

/// Result type alias for scopemesh operations
pub type MeshResult<T> = Result<T, MeshError>;
