// crates/fleet-gate-core/src/runtime/canonical.rs
// ============================================================================
// Module: Fleet Gate Result Canonicalizer
// Description: Shape raw evaluator output into violations and insights.
// Purpose: Attach provenance and protect reserved metadata keys.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Each raw result becomes a [`ConstraintViolation`] whose metadata is the
//! evaluator details plus two reserved keys: `ancestry_path` and a
//! synthesized `constraint` submap of labels, annotations, and parameters.
//! Raw details may not use either reserved key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::asset::Asset;
use crate::core::errors::ReviewError;
use crate::core::value::PolicyMap;
use crate::core::value::PolicyValue;
use crate::core::violation::ConstraintViolation;
use crate::core::violation::Insight;
use crate::core::violation::Violation;
use crate::interfaces::RawResult;
use crate::runtime::binder::BoundConstraint;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Reserved metadata key holding the constraint submap.
pub const CONSTRAINT_KEY: &str = "constraint";

/// Reserved metadata key holding the asset ancestry path.
pub const ANCESTRY_PATH_KEY: &str = "ancestry_path";

/// Reserved metadata keys.
const RESERVED_KEYS: [&str; 2] = [CONSTRAINT_KEY, ANCESTRY_PATH_KEY];

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Canonicalizes one raw result.
///
/// # Errors
///
/// Returns [`ReviewError::ReservedKeyCollision`] when raw details use a
/// reserved key and [`ReviewError::MalformedResult`] when the message is empty
/// or the details are not an object.
pub fn canonicalize(
    asset: &Asset,
    bound: &BoundConstraint,
    raw: &RawResult,
) -> Result<ConstraintViolation, ReviewError> {
    let constraint_name = bound.name.to_string();
    if raw.message.is_empty() {
        return Err(ReviewError::MalformedResult {
            asset: asset.name().to_string(),
            constraint: constraint_name,
            reason: "empty message".to_string(),
        });
    }
    let mut metadata = match PolicyValue::from(&raw.details) {
        PolicyValue::Map(map) => map,
        PolicyValue::Null => PolicyMap::new(),
        _ => {
            return Err(ReviewError::MalformedResult {
                asset: asset.name().to_string(),
                constraint: constraint_name,
                reason: "details must be an object".to_string(),
            });
        }
    };
    if let Some(key) = RESERVED_KEYS.iter().find(|key| metadata.contains_key(**key)) {
        return Err(ReviewError::ReservedKeyCollision {
            asset: asset.name().to_string(),
            constraint: constraint_name,
            key: (*key).to_string(),
        });
    }

    let constraint = &bound.constraint;
    let mut submap = PolicyMap::new();
    submap.insert("labels".to_string(), PolicyValue::string_map(&constraint.metadata.labels));
    submap.insert(
        "annotations".to_string(),
        PolicyValue::string_map(&constraint.metadata.annotations),
    );
    submap.insert("parameters".to_string(), PolicyValue::from(&constraint.spec.parameters));
    metadata.insert(CONSTRAINT_KEY.to_string(), PolicyValue::Map(submap));
    metadata.insert(ANCESTRY_PATH_KEY.to_string(), PolicyValue::from(asset.ancestry_path()));

    Ok(ConstraintViolation {
        message: raw.message.clone(),
        metadata,
        constraint_name: bound.name.clone(),
        constraint: Arc::clone(constraint),
        severity: constraint.severity().to_string(),
    })
}

/// Projects violations into insights.
#[must_use]
pub fn to_insights(violations: &[Violation]) -> Vec<Insight> {
    violations.iter().map(Insight::from).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
