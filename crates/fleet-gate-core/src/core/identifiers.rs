// crates/fleet-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Fleet Gate Identifiers
// Description: Canonical opaque identifiers for templates, constraints, and targets.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the identifiers threaded through the policy engine.
//! Identifiers are opaque strings on the wire; no normalization is applied by
//! these types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Target identifier (for example `validation.gcp.forsetisecurity.org`).
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetName(String);

impl TargetName {
    /// Creates a new target identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TargetName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Kind minted by a template and referenced by its constraints.
///
/// # Invariants
/// - Unique across a loaded policy library (enforced by the compiler).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateKind(String);

impl TemplateKind {
    /// Creates a new template kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TemplateKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TemplateKind {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Fully qualified constraint name in `Kind.Name` form.
///
/// # Invariants
/// - Built from a constraint kind and its display name; see
///   [`ConstraintName::qualified`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintName(String);

impl ConstraintName {
    /// Creates a constraint name from a preformatted string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Builds the `Kind.Name` form.
    #[must_use]
    pub fn qualified(kind: &TemplateKind, name: &str) -> Self {
        Self(format!("{}.{}", kind.as_str(), name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstraintName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
