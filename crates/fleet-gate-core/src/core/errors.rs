// crates/fleet-gate-core/src/core/errors.rs
// ============================================================================
// Module: Fleet Gate Errors
// Description: Load-time and review-time error taxonomy.
// Purpose: Give every failure a kind, a location, and the rule that failed.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Load-time errors ([`PolicyError`]) are accumulated across a whole policy
//! library into [`PolicyErrors`]; an engine is only constructed when the list
//! is empty. Review-time errors ([`ReviewError`]) are scoped to one asset and
//! never abort a batch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

// ============================================================================
// SECTION: Load-Time Errors
// ============================================================================

/// Policy library load and engine construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Document is syntactically invalid or cannot be classified.
    #[error("bad config in {path}: {reason}")]
    BadConfig {
        /// Document path.
        path: String,
        /// Failure reason.
        reason: String,
    },
    /// Document failed schema validation.
    #[error("schema violation in {path}: {}", messages.join("; "))]
    SchemaViolation {
        /// Document path.
        path: String,
        /// Validator messages naming the offending fields.
        messages: Vec<String>,
    },
    /// Policy-language compiler rejected a template/target pair.
    #[error("template {template} failed to compile for target {target}: {diagnostic}")]
    CompileError {
        /// Template generated kind.
        template: String,
        /// Target name.
        target: String,
        /// Compiler diagnostic.
        diagnostic: String,
    },
    /// Constraint references an unknown template kind.
    #[error("constraint {name} references unknown template kind {kind}")]
    UnboundConstraint {
        /// Constraint metadata name.
        name: String,
        /// Referenced kind.
        kind: String,
    },
    /// Match or exclude pattern breaks the ancestry grammar.
    #[error("constraint {constraint} has invalid {field} glob at index {index}: `{token}`")]
    InvalidGlob {
        /// Qualified constraint name.
        constraint: String,
        /// Match field (`target` or `exclude`).
        field: String,
        /// Position of the pattern in its list.
        index: usize,
        /// Offending token.
        token: String,
    },
}

/// Accumulated load-time errors.
///
/// # Invariants
/// - Errors are kept in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyErrors {
    /// Collected errors.
    errors: Vec<PolicyError>,
}

impl PolicyErrors {
    /// Creates an empty error set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            errors: Vec::new(),
        }
    }

    /// Records an error.
    pub fn push(&mut self, error: PolicyError) {
        self.errors.push(error);
    }

    /// Records an error unless an identical one is already present.
    pub fn push_unique(&mut self, error: PolicyError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    /// Appends every error from another set.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Returns true when no errors were recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of recorded errors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns the recorded errors.
    #[must_use]
    pub fn errors(&self) -> &[PolicyError] {
        &self.errors
    }

    /// Consumes the set and returns the recorded errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<PolicyError> {
        self.errors
    }

    /// Returns `Ok(value)` when empty, otherwise the accumulated errors.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.errors.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for PolicyErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} policy error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PolicyErrors {}

impl From<PolicyError> for PolicyErrors {
    fn from(error: PolicyError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl FromIterator<PolicyError> for PolicyErrors {
    fn from_iter<I: IntoIterator<Item = PolicyError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PolicyErrors {
    type IntoIter = std::vec::IntoIter<PolicyError>;
    type Item = PolicyError;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

// ============================================================================
// SECTION: Review-Time Errors
// ============================================================================

/// Per-asset review errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    /// Asset is missing required fields or has the wrong payload count.
    #[error("malformed asset {asset}: {reason}")]
    MalformedAsset {
        /// Asset name (empty when absent).
        asset: String,
        /// Failing rule.
        reason: String,
    },
    /// Asset carries neither `ancestors` nor `ancestry_path`.
    #[error("asset {asset} has no ancestry")]
    MissingAncestry {
        /// Asset name.
        asset: String,
    },
    /// No registered target accepted the asset.
    #[error("asset {asset} of type {asset_type} is not handled by any target")]
    UnroutableAsset {
        /// Asset name.
        asset: String,
        /// Asset type.
        asset_type: String,
    },
    /// Policy-language evaluator returned an error.
    #[error("evaluation of {constraint} failed for asset {asset}: {message}")]
    EvaluatorFailure {
        /// Asset name.
        asset: String,
        /// Qualified constraint name.
        constraint: String,
        /// Evaluator message.
        message: String,
    },
    /// Evaluator metadata used a reserved key.
    #[error("constraint {constraint} returned reserved metadata key `{key}` for asset {asset}")]
    ReservedKeyCollision {
        /// Asset name.
        asset: String,
        /// Qualified constraint name.
        constraint: String,
        /// Reserved key.
        key: String,
    },
    /// Evaluator result broke the canonicalization contract.
    #[error("constraint {constraint} returned a malformed result for asset {asset}: {reason}")]
    MalformedResult {
        /// Asset name.
        asset: String,
        /// Qualified constraint name.
        constraint: String,
        /// Failing rule.
        reason: String,
    },
    /// Review was cancelled cooperatively.
    #[error("review of asset {asset} was cancelled")]
    Cancelled {
        /// Asset name.
        asset: String,
    },
}

impl ReviewError {
    /// Returns the asset name carried by the error.
    #[must_use]
    pub fn asset_name(&self) -> &str {
        match self {
            Self::MalformedAsset {
                asset, ..
            }
            | Self::MissingAncestry {
                asset,
            }
            | Self::UnroutableAsset {
                asset, ..
            }
            | Self::EvaluatorFailure {
                asset, ..
            }
            | Self::ReservedKeyCollision {
                asset, ..
            }
            | Self::MalformedResult {
                asset, ..
            }
            | Self::Cancelled {
                asset,
            } => asset,
        }
    }
}

/// One failed asset within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Index of the asset in the request.
    pub index: usize,
    /// Asset name (empty when absent).
    pub asset: String,
    /// Review error.
    pub error: ReviewError,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset[{}] {}: {}", self.index, self.asset, self.error)
    }
}

/// Accumulated review errors for a batch.
///
/// # Invariants
/// - Failures are sorted by asset index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchError {
    /// Collected failures.
    failures: Vec<BatchFailure>,
}

impl BatchError {
    /// Builds a batch error from failures, sorting them by index.
    #[must_use]
    pub fn new(mut failures: Vec<BatchFailure>) -> Self {
        failures.sort_by_key(|failure| failure.index);
        Self {
            failures,
        }
    }

    /// Returns the failures in index order.
    #[must_use]
    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    /// Returns true when no failures were recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} asset(s) failed review", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}
