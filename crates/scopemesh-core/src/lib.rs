//! # Scopemesh Core
//!
//! Core identifiers, records, and errors shared by the scopemesh crates.
//!
//! ## Key Types
//!
//! - [`ScopeId`], [`PeerId`], [`ScopeKind`]: opaque string identifiers
//! - [`Scope`]: a named administrative domain with open key/value state
//! - [`Peer`]: a network participant and the scopes it serves
//! - [`StateUpdate`]: a merged delta ready to be sent to a scope's peers
//! - [`Clock`]: time abstraction for testability

pub mod clock;
pub mod error;
pub mod id;
pub mod peer;
pub mod scope;
pub mod update;

// Re-export main types
pub use clock::*;
pub use error::*;
pub use id::*;
pub use peer::*;
pub use scope::*;
pub use update::*;
