//! Identifier types for scopes and peers
//!
//! Both identifiers are opaque strings. Emptiness is not rejected at
//! construction; the registry and peer network validate ids when records
//! are written, so that the error names the operation that failed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a scope
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    /// Create a new scope ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ScopeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ScopeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for a peer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Create a new peer ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short display form (first 8 chars), for log fields
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for PeerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Free-form classification tag for a scope
///
/// The tag is never checked against the hierarchy; a `project` may sit
/// directly under `global` if the caller says so.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeKind(String);

impl ScopeKind {
    pub const GLOBAL: &'static str = "global";
    pub const ORG: &'static str = "org";
    pub const PROJECT: &'static str = "project";

    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn global() -> Self {
        Self::new(Self::GLOBAL)
    }

    pub fn org() -> Self {
        Self::new(Self::ORG)
    }

    pub fn project() -> Self {
        Self::new(Self::PROJECT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}
