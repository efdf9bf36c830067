//! # Scopemesh Registry
//!
//! Keyed, concurrently readable store of [`Scope`](scopemesh_core::Scope)
//! records.
//!
//! Registration is an upsert: registering an id twice replaces the first
//! record and re-stamps both timestamps. State changes arrive as deltas
//! through [`ScopeRegistry::propagate`], which merges per key and moves
//! `updated_at` strictly forward.
//!
//! Parent links are soft. The hierarchy helpers ([`ScopeRegistry::roots`],
//! [`ScopeRegistry::children`], [`ScopeRegistry::ancestors`]) follow them
//! as stored and tolerate dangling parents and cycles.
//!
//! ## Example
//!
//! ```rust,ignore
//! use scopemesh_core::{Scope, ScopeKind};
//! use scopemesh_registry::ScopeRegistry;
//!
//! let registry = ScopeRegistry::new();
//! registry.register(Scope::new("global", ScopeKind::global()))?;
//! registry.register(Scope::new("org-1", ScopeKind::org()).with_parent("global"))?;
//!
//! let merged = registry.propagate(&"org-1".into(), &delta)?;
//! ```

pub mod registry;

pub use registry::ScopeRegistry;
